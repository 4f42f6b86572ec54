//! Tunnel Configuration
//!
//! A whole config file: one `[Interface]` section followed by any number
//! of `[Peer]` sections.

use crate::error::{BadConfigError, Location, Reason, Section};
use crate::interface::Interface;
use crate::peer::Peer;
use std::fmt;
use tracing::debug;

/// Complete tunnel configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
    interface: Interface,
    peers: Vec<Peer>,
}

enum Current {
    None,
    Interface,
    Peer,
}

impl Config {
    pub fn new(interface: Interface, peers: Vec<Peer>) -> Self {
        Self { interface, peers }
    }

    /// Parse an INI-style config.
    ///
    /// `#` starts a comment, blank lines are ignored and section headers
    /// are case-insensitive.
    pub fn parse(text: &str) -> Result<Self, BadConfigError> {
        let mut interface_lines: Option<Vec<String>> = None;
        let mut peer_blocks: Vec<Vec<String>> = Vec::new();
        let mut current = Current::None;

        for raw in text.lines() {
            let line = raw.split_once('#').map_or(raw, |(before, _)| before).trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                if line.eq_ignore_ascii_case("[Interface]") {
                    interface_lines.get_or_insert_with(Vec::new);
                    current = Current::Interface;
                } else if line.eq_ignore_ascii_case("[Peer]") {
                    peer_blocks.push(Vec::new());
                    current = Current::Peer;
                } else {
                    return Err(BadConfigError::new(
                        Section::Config,
                        Location::TopLevel,
                        Reason::UnknownSection,
                        Some(line.to_string()),
                    ));
                }
                continue;
            }

            let target = match current {
                Current::Interface => interface_lines.as_mut(),
                Current::Peer => peer_blocks.last_mut(),
                Current::None => None,
            };
            match target {
                Some(lines) => lines.push(line.to_string()),
                None => {
                    return Err(BadConfigError::new(
                        Section::Config,
                        Location::TopLevel,
                        Reason::SyntaxError,
                        Some(line.to_string()),
                    ));
                }
            }
        }

        let interface_lines = interface_lines.ok_or_else(|| {
            BadConfigError::new(Section::Config, Location::TopLevel, Reason::MissingSection, None)
        })?;

        let interface = Interface::parse(&interface_lines)?;
        let peers = peer_blocks
            .iter()
            .map(Peer::parse)
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Parsed config {} with {} peer(s)", interface, peers.len());
        Ok(Self { interface, peers })
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Render the file consumed by the quick tool
    pub fn to_awg_quick_string(&self) -> String {
        let mut out = String::from("[Interface]\n");
        out.push_str(&self.interface.to_awg_quick_string());
        for peer in &self.peers {
            out.push_str("\n[Peer]\n");
            out.push_str(&peer.to_awg_quick_string());
        }
        out
    }

    /// Render the bytes written to the engine's configuration channel
    pub fn to_awg_userspace_string(&self) -> String {
        let mut out = self.interface.to_awg_userspace_string();
        out.push_str("replace_peers=true\n");
        for peer in &self.peers {
            out.push_str(&peer.to_awg_userspace_string());
        }
        out
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interface)?;
        for peer in &self.peers {
            write!(f, " {peer}")?;
        }
        Ok(())
    }
}
