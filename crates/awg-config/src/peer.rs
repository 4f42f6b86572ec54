//! Peer Section
//!
//! A `[Peer]` block: the remote public key, optional preshared key,
//! routed prefixes, endpoint and keepalive interval.

use crate::attribute::{self, Attribute};
use crate::error::{BadConfigError, Location, Reason, Section};
use crate::keys::{PresharedKey, PublicKey};
use crate::network::{InetEndpoint, InetNetwork};
use std::fmt;

const MAX_KEEPALIVE: i32 = 65535;

/// Immutable `[Peer]` configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    public_key: PublicKey,
    preshared_key: Option<PresharedKey>,
    allowed_ips: Vec<InetNetwork>,
    endpoint: Option<InetEndpoint>,
    persistent_keepalive: Option<u16>,
}

impl Peer {
    pub fn builder() -> PeerBuilder {
        PeerBuilder::default()
    }

    /// Parse a series of `Key = Value` lines
    pub fn parse<I>(lines: I) -> Result<Self, BadConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut builder = PeerBuilder::default();
        for line in lines {
            let line = line.as_ref();
            let attr = Attribute::parse(line)
                .ok_or_else(|| error(Location::TopLevel, Reason::SyntaxError, Some(line)))?;
            let value = attr.value();

            match attr.key().to_ascii_lowercase().as_str() {
                "allowedips" => builder.parse_allowed_ips(value)?,
                "endpoint" => builder.parse_endpoint(value)?,
                "persistentkeepalive" => builder.parse_persistent_keepalive(value)?,
                "presharedkey" => builder.parse_preshared_key(value)?,
                "publickey" => builder.parse_public_key(value)?,
                _ => {
                    return Err(error(
                        Location::TopLevel,
                        Reason::UnknownAttribute,
                        Some(attr.key()),
                    ));
                }
            };
        }
        builder.build()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn preshared_key(&self) -> Option<&PresharedKey> {
        self.preshared_key.as_ref()
    }

    pub fn allowed_ips(&self) -> &[InetNetwork] {
        &self.allowed_ips
    }

    pub fn endpoint(&self) -> Option<&InetEndpoint> {
        self.endpoint.as_ref()
    }

    pub fn persistent_keepalive(&self) -> Option<u16> {
        self.persistent_keepalive
    }

    /// Render as `Key = Value` lines for the quick tool
    pub fn to_awg_quick_string(&self) -> String {
        let mut out = format!("PublicKey = {}\n", self.public_key.to_base64());
        if let Some(psk) = &self.preshared_key {
            out.push_str(&format!("PresharedKey = {}\n", psk.to_base64()));
        }
        if !self.allowed_ips.is_empty() {
            out.push_str(&format!("AllowedIPs = {}\n", attribute::join(&self.allowed_ips)));
        }
        if let Some(endpoint) = &self.endpoint {
            out.push_str(&format!("Endpoint = {endpoint}\n"));
        }
        if let Some(keepalive) = self.persistent_keepalive {
            out.push_str(&format!("PersistentKeepalive = {keepalive}\n"));
        }
        out
    }

    /// Render as `key=value` lines for the engine's configuration channel
    pub fn to_awg_userspace_string(&self) -> String {
        let mut out = format!("public_key={}\n", self.public_key.to_hex());
        if let Some(psk) = &self.preshared_key {
            out.push_str(&format!("preshared_key={}\n", psk.to_hex()));
        }
        if let Some(endpoint) = &self.endpoint {
            out.push_str(&format!("endpoint={endpoint}\n"));
        }
        if let Some(keepalive) = self.persistent_keepalive {
            out.push_str(&format!("persistent_keepalive_interval={keepalive}\n"));
        }
        out.push_str("replace_allowed_ips=true\n");
        for network in &self.allowed_ips {
            out.push_str(&format!("allowed_ip={network}\n"));
        }
        out
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Peer {})", self.public_key.to_base64())
    }
}

fn error(location: Location, reason: impl Into<Reason>, text: Option<&str>) -> BadConfigError {
    BadConfigError::new(Section::Peer, location, reason, text.map(str::to_string))
}

/// Mutable accumulator for a [`Peer`]
#[derive(Debug, Clone, Default)]
pub struct PeerBuilder {
    // No default; must be provided before building.
    public_key: Option<PublicKey>,
    preshared_key: Option<PresharedKey>,
    allowed_ips: Vec<InetNetwork>,
    endpoint: Option<InetEndpoint>,
    persistent_keepalive: Option<u16>,
}

impl PeerBuilder {
    pub fn build(&self) -> Result<Peer, BadConfigError> {
        let public_key = self
            .public_key
            .ok_or_else(|| error(Location::PublicKey, Reason::MissingAttribute, None))?;

        Ok(Peer {
            public_key,
            preshared_key: self.preshared_key.clone(),
            allowed_ips: self.allowed_ips.clone(),
            endpoint: self.endpoint.clone(),
            persistent_keepalive: self.persistent_keepalive,
        })
    }

    pub fn add_allowed_ip(&mut self, network: InetNetwork) -> &mut Self {
        if !self.allowed_ips.contains(&network) {
            self.allowed_ips.push(network);
        }
        self
    }

    pub fn set_endpoint(&mut self, endpoint: InetEndpoint) -> &mut Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn set_public_key(&mut self, key: PublicKey) -> &mut Self {
        self.public_key = Some(key);
        self
    }

    pub fn set_preshared_key(&mut self, key: PresharedKey) -> &mut Self {
        self.preshared_key = Some(key);
        self
    }

    pub fn set_persistent_keepalive(&mut self, seconds: i32) -> Result<&mut Self, BadConfigError> {
        if !(0..=MAX_KEEPALIVE).contains(&seconds) {
            return Err(error(
                Location::PersistentKeepalive,
                Reason::InvalidValue,
                Some(seconds.to_string().as_str()),
            ));
        }
        self.persistent_keepalive = u16::try_from(seconds).ok().filter(|s| *s != 0);
        Ok(self)
    }

    pub fn parse_allowed_ips(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        for token in attribute::split(value) {
            let network = token
                .parse::<InetNetwork>()
                .map_err(|e| error(Location::AllowedIps, e, Some(token.as_str())))?;
            self.add_allowed_ip(network);
        }
        Ok(self)
    }

    pub fn parse_endpoint(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        let endpoint = value
            .parse::<InetEndpoint>()
            .map_err(|e| error(Location::Endpoint, e, Some(value)))?;
        Ok(self.set_endpoint(endpoint))
    }

    pub fn parse_persistent_keepalive(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        // wg-quick accepts "off" as an explicit "no keepalive"
        if value.eq_ignore_ascii_case("off") {
            return self.set_persistent_keepalive(0);
        }
        let seconds = value.parse::<i32>().map_err(|_| {
            error(Location::PersistentKeepalive, Reason::InvalidNumber, Some(value))
        })?;
        self.set_persistent_keepalive(seconds)
    }

    pub fn parse_preshared_key(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        let key = PresharedKey::from_base64(value)
            .map_err(|e| error(Location::PresharedKey, e, None))?;
        Ok(self.set_preshared_key(key))
    }

    pub fn parse_public_key(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        let key = PublicKey::from_base64(value).map_err(|e| error(Location::PublicKey, e, None))?;
        Ok(self.set_public_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_KEY: &str = "3p7bfXt9wbTTW2HC7OQ1Nz+DQ8hbeGdNrfx+FG+IK08=";

    fn peer_lines(extra: &[&str]) -> Vec<String> {
        let mut lines = vec![format!("PublicKey = {PUBLIC_KEY}")];
        lines.extend(extra.iter().map(|s| s.to_string()));
        lines
    }

    #[test]
    fn test_parse_and_roundtrip() {
        let peer = Peer::parse(peer_lines(&[
            "AllowedIPs = 0.0.0.0/0, ::/0",
            "Endpoint = vpn.example.com:51820",
            "PersistentKeepalive = 25",
            "PresharedKey = XasIfmJKikt54X+Lg4AO5m87sSkmGLb9HC+LJ/+I4Os=",
        ]))
        .unwrap();

        assert_eq!(peer.allowed_ips().len(), 2);
        assert_eq!(peer.persistent_keepalive(), Some(25));
        assert_eq!(peer.endpoint().map(|e| e.port()), Some(51820));

        let reparsed = Peer::parse(peer.to_awg_quick_string().lines()).unwrap();
        assert_eq!(peer, reparsed);
    }

    #[test]
    fn test_userspace_string() {
        let peer = Peer::parse(peer_lines(&["AllowedIPs = 10.0.0.0/8", "Endpoint = 1.2.3.4:51820"])).unwrap();
        assert_eq!(
            peer.to_awg_userspace_string(),
            "public_key=de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f\n\
             endpoint=1.2.3.4:51820\n\
             replace_allowed_ips=true\n\
             allowed_ip=10.0.0.0/8\n"
        );
    }

    #[test]
    fn test_missing_public_key() {
        let err = Peer::parse(["AllowedIPs = 0.0.0.0/0"]).unwrap_err();
        assert_eq!(err.section, Section::Peer);
        assert_eq!(err.reason, Reason::MissingAttribute);
    }

    #[test]
    fn test_keepalive_off_and_bounds() {
        let peer = Peer::parse(peer_lines(&["PersistentKeepalive = off"])).unwrap();
        assert_eq!(peer.persistent_keepalive(), None);

        let err = Peer::parse(peer_lines(&["PersistentKeepalive = 70000"])).unwrap_err();
        assert_eq!(err.reason, Reason::InvalidValue);
    }

    #[test]
    fn test_unknown_peer_attribute() {
        let err = Peer::parse(peer_lines(&["Jc = 4"])).unwrap_err();
        assert_eq!(err.reason, Reason::UnknownAttribute);
        assert_eq!(err.text.as_deref(), Some("Jc"));
    }
}
