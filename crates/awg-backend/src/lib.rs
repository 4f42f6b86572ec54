//! AmneziaWG quick-tool backend
//!
//! Drives tunnels up and down through `awg-quick`, enforces the
//! one-active-tunnel policy and watches new tunnels for their first
//! handshake.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   set_state    ┌────────────────┐
//! │     Caller       │───────────────▶│ AwgQuickBackend│
//! │ (Tunnel handles) │◀───────────────│                │
//! └──────────────────┘ on_state_change└───┬────────┬───┘
//!                                         │        │ start/stop
//!                          command lines  │        ▼
//!                                         │  ┌──────────────┐
//!                                         │  │ StatusPoller │──▶ StatusCallback
//!                                         ▼  └──────┬───────┘
//!                                   ┌───────────┐   │ latest-handshakes
//!                                   │ RootShell │◀──┘
//!                                   └───────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut backend = AwgQuickBackend::with_process_shell(BackendSettings::default());
//! let state = backend.set_state(&tunnel, TunnelState::Up, Some(config)).await?;
//! ```

mod backend;
mod error;
mod handshake;
mod poller;
mod query;
mod settings;
mod shell;
mod statistics;
mod tunnel;

pub use backend::AwgQuickBackend;
pub use error::{BackendError, RollbackOutcome, TransitionError};
pub use handshake::HandshakeStatus;
pub use poller::{HandshakeSource, StatusCallback, StatusPoller};
pub use query::ShellQuery;
pub use settings::{BackendSettings, SettingsError};
pub use shell::{ProcessShell, RootShell, ShellOutput, ShellToolsCheck, ToolsInstaller};
pub use statistics::{PeerStats, Statistics};
pub use tunnel::{Tunnel, TunnelState};
