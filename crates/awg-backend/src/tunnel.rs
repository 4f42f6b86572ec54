//! Tunnel handle
//!
//! The backend does not own tunnels. It refers to them by name and tells
//! them about every confirmed transition.

use std::fmt;

/// Tunnel state as requested by callers and reported back to tunnels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelState {
    Down,
    Up,
    /// Request-only: flip whatever the current state is
    Toggle,
}

impl TunnelState {
    /// Resolve `Toggle` against whether the tunnel is currently up
    pub fn resolve(self, currently_up: bool) -> TunnelState {
        match self {
            TunnelState::Toggle if currently_up => TunnelState::Down,
            TunnelState::Toggle => TunnelState::Up,
            other => other,
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, TunnelState::Up)
    }

    /// Argument understood by the quick tool
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelState::Down => "down",
            TunnelState::Up => "up",
            TunnelState::Toggle => "toggle",
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named tunnel that receives state-change notifications
pub trait Tunnel: Send + Sync {
    fn name(&self) -> &str;

    /// Called after the quick tool confirmed a transition
    fn on_state_change(&self, state: TunnelState);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_resolution() {
        assert_eq!(TunnelState::Toggle.resolve(true), TunnelState::Down);
        assert_eq!(TunnelState::Toggle.resolve(false), TunnelState::Up);
        assert_eq!(TunnelState::Up.resolve(true), TunnelState::Up);
        assert_eq!(TunnelState::Down.resolve(false), TunnelState::Down);
    }

    #[test]
    fn test_quick_tool_verbs() {
        assert_eq!(TunnelState::Up.to_string(), "up");
        assert_eq!(TunnelState::Down.as_str(), "down");
    }
}
