//! AmneziaWG tunnel configuration model
//!
//! Parses, validates and re-serializes the line-oriented `Key = Value`
//! tunnel config format into immutable values.
//!
//! # Serialization forms
//!
//! | Form | Method | Consumer |
//! |------|--------|----------|
//! | `Key = Value` | `to_awg_quick_string` | `awg-quick` config file |
//! | `key=value` | `to_awg_userspace_string` | engine configuration channel |
//! | `(Interface <pubkey> @port)` | `Display` | logs and diagnostics |
//!
//! # Obfuscation parameters
//!
//! `Jc`, `Jmin`, `Jmax`, `S1`, `S2` and `H1`-`H4` are carried as opaque
//! validated integers. A value of `0` means "use the engine default" and is
//! stored as absent.

pub mod attribute;
mod config;
mod error;
mod interface;
mod keys;
mod network;
mod peer;

pub use attribute::Attribute;
pub use config::Config;
pub use error::{BadConfigError, Location, Reason, Section};
pub use interface::{Interface, InterfaceBuilder};
pub use keys::{KeyError, KeyPair, PresharedKey, PrivateKey, PublicKey, KEY_LEN};
pub use network::{InetEndpoint, InetNetwork, NetworkParseError};
pub use peer::{Peer, PeerBuilder};
