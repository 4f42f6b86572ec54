//! Configuration errors
//!
//! Every failure names the section and attribute it came from so the
//! caller can point the user at the offending line.

use crate::keys::KeyError;
use crate::network::NetworkParseError;
use std::fmt;

/// Section of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Config,
    Interface,
    Peer,
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Config => "Config",
            Section::Interface => "Interface",
            Section::Peer => "Peer",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute (or position) within a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    TopLevel,
    Address,
    Dns,
    ExcludedApplications,
    IncludedApplications,
    ListenPort,
    Mtu,
    PrivateKey,
    JunkPacketCount,
    JunkPacketMinSize,
    JunkPacketMaxSize,
    InitPacketJunkSize,
    ResponsePacketJunkSize,
    InitPacketMagicHeader,
    ResponsePacketMagicHeader,
    UnderloadPacketMagicHeader,
    TransportPacketMagicHeader,
    AllowedIps,
    Endpoint,
    PersistentKeepalive,
    PresharedKey,
    PublicKey,
}

impl Location {
    /// Attribute name as written in the human-readable form
    pub fn name(&self) -> &'static str {
        match self {
            Location::TopLevel => "",
            Location::Address => "Address",
            Location::Dns => "DNS",
            Location::ExcludedApplications => "ExcludedApplications",
            Location::IncludedApplications => "IncludedApplications",
            Location::ListenPort => "ListenPort",
            Location::Mtu => "MTU",
            Location::PrivateKey => "PrivateKey",
            Location::JunkPacketCount => "Jc",
            Location::JunkPacketMinSize => "Jmin",
            Location::JunkPacketMaxSize => "Jmax",
            Location::InitPacketJunkSize => "S1",
            Location::ResponsePacketJunkSize => "S2",
            Location::InitPacketMagicHeader => "H1",
            Location::ResponsePacketMagicHeader => "H2",
            Location::UnderloadPacketMagicHeader => "H3",
            Location::TransportPacketMagicHeader => "H4",
            Location::AllowedIps => "AllowedIPs",
            Location::Endpoint => "Endpoint",
            Location::PersistentKeepalive => "PersistentKeepalive",
            Location::PresharedKey => "PresharedKey",
            Location::PublicKey => "PublicKey",
        }
    }
}

/// Why a config was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reason {
    #[error("syntax error")]
    SyntaxError,

    #[error("unknown attribute")]
    UnknownAttribute,

    #[error("unknown section")]
    UnknownSection,

    #[error("missing attribute")]
    MissingAttribute,

    #[error("missing section")]
    MissingSection,

    #[error("invalid value")]
    InvalidValue,

    #[error("invalid key combination")]
    InvalidKey,

    #[error("invalid number")]
    InvalidNumber,

    #[error("{0}")]
    InvalidAddress(#[from] NetworkParseError),

    #[error("invalid key: {0}")]
    InvalidKeyFormat(#[from] KeyError),
}

/// A rejected configuration, tagged with where it went wrong
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{section}]{}: {reason}{}", location_label(.location), text_label(.text))]
pub struct BadConfigError {
    pub section: Section,
    pub location: Location,
    #[source]
    pub reason: Reason,
    /// Offending input (line, key or value), when there is one
    pub text: Option<String>,
}

impl BadConfigError {
    pub fn new(
        section: Section,
        location: Location,
        reason: impl Into<Reason>,
        text: Option<String>,
    ) -> Self {
        Self {
            section,
            location,
            reason: reason.into(),
            text,
        }
    }
}

fn location_label(location: &Location) -> String {
    match location {
        Location::TopLevel => String::new(),
        other => format!(" {}", other.name()),
    }
}

fn text_label(text: &Option<String>) -> String {
    text.as_ref().map(|t| format!(" ({t:?})")).unwrap_or_default()
}
