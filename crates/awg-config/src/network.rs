//! Network Values
//!
//! Address prefixes, peer endpoints and the hostname check used when
//! DNS entries fall back to search domains.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// An IP address with a prefix length (e.g. `10.0.0.2/32`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InetNetwork {
    address: IpAddr,
    prefix: u8,
}

impl InetNetwork {
    /// Create a network, rejecting prefixes longer than the address family allows
    pub fn new(address: IpAddr, prefix: u8) -> Result<Self, NetworkParseError> {
        if prefix > max_prefix(&address) {
            return Err(NetworkParseError::InvalidPrefix(format!("{address}/{prefix}")));
        }
        Ok(Self { address, prefix })
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

fn max_prefix(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for InetNetwork {
    type Err = NetworkParseError;

    /// Parse CIDR notation; a bare address gets the full host prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let address = parse_ip_literal(addr)?;
        let prefix = match prefix {
            Some(p) => p
                .parse::<u8>()
                .map_err(|_| NetworkParseError::InvalidPrefix(s.to_string()))?,
            None => max_prefix(&address),
        };

        Self::new(address, prefix)
    }
}

impl fmt::Display for InetNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

/// Peer endpoint (`host:port` or `[v6]:port`); the host is not resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InetEndpoint {
    host: String,
    port: u16,
}

impl InetEndpoint {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for InetEndpoint {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetworkParseError::InvalidEndpoint(s.to_string());

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, port) = rest.split_once("]:").ok_or_else(invalid)?;
            host.parse::<std::net::Ipv6Addr>().map_err(|_| invalid())?;
            (host, port)
        } else {
            let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
            if host.contains(':') || (host.parse::<IpAddr>().is_err() && !is_hostname(host)) {
                return Err(invalid());
            }
            (host, port)
        };

        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for InetEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Parse an IP literal, distinguishing "not an address at all" from a
/// token that only looks like a broken literal.
pub fn parse_ip_literal(s: &str) -> Result<IpAddr, NetworkParseError> {
    s.parse::<IpAddr>().map_err(|_| {
        if looks_like_ip_literal(s) {
            NetworkParseError::MalformedAddress(s.to_string())
        } else {
            NetworkParseError::NotAnAddress(s.to_string())
        }
    })
}

fn looks_like_ip_literal(s: &str) -> bool {
    s.contains(':') || (!s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

/// RFC 1123 hostname check (labels of 1-63 alphanumerics or hyphens,
/// 253 characters total, optional trailing dot)
pub fn is_hostname(s: &str) -> bool {
    let name = s.strip_suffix('.').unwrap_or(s);
    if name.is_empty() || name.len() > 253 {
        return false;
    }

    // All-numeric labels would make dotted-quad fragments pass as names
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.chars().all(|c| c.is_ascii_digit())
    })
}

/// Network value parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkParseError {
    #[error("Not an IP address: {0}")]
    NotAnAddress(String),

    #[error("Malformed IP address: {0}")]
    MalformedAddress(String),

    #[error("Invalid prefix length: {0}")]
    InvalidPrefix(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        let net: InetNetwork = "10.0.0.2/24".parse().unwrap();
        assert_eq!(net.prefix(), 24);
        assert_eq!(net.to_string(), "10.0.0.2/24");

        let host: InetNetwork = "fd00::2".parse().unwrap();
        assert_eq!(host.prefix(), 128);
    }

    #[test]
    fn test_network_rejects_bad_prefix() {
        assert!(matches!(
            "10.0.0.2/33".parse::<InetNetwork>(),
            Err(NetworkParseError::InvalidPrefix(_))
        ));
        assert!("10.0.0.2/x".parse::<InetNetwork>().is_err());
        assert!("example.com/24".parse::<InetNetwork>().is_err());
    }

    #[test]
    fn test_ip_literal_classification() {
        assert!(parse_ip_literal("1.2.3.4").is_ok());
        assert!(matches!(
            parse_ip_literal("999.999.999.999"),
            Err(NetworkParseError::MalformedAddress(_))
        ));
        assert!(matches!(
            parse_ip_literal("fd00::zz"),
            Err(NetworkParseError::MalformedAddress(_))
        ));
        assert!(matches!(
            parse_ip_literal("example.com"),
            Err(NetworkParseError::NotAnAddress(_))
        ));
    }

    #[test]
    fn test_hostname() {
        assert!(is_hostname("example.com"));
        assert!(is_hostname("corp.example.com."));
        assert!(is_hostname("localdomain"));
        assert!(!is_hostname("-bad.example"));
        assert!(!is_hostname("under_score.example"));
        assert!(!is_hostname("1.2.3"));
        assert!(!is_hostname("1.2.3.4.example"));
        assert!(!is_hostname("host.42.example"));
        assert!(is_hostname("123abc.example"));
        assert!(!is_hostname(""));
    }

    #[test]
    fn test_endpoint_parse() {
        let ep: InetEndpoint = "vpn.example.com:51820".parse().unwrap();
        assert_eq!(ep.host(), "vpn.example.com");
        assert_eq!(ep.port(), 51820);

        let v6: InetEndpoint = "[2001:db8::1]:51820".parse().unwrap();
        assert_eq!(v6.to_string(), "[2001:db8::1]:51820");

        assert!("vpn.example.com".parse::<InetEndpoint>().is_err());
        assert!("2001:db8::1:51820".parse::<InetEndpoint>().is_err());
        assert!("host:99999".parse::<InetEndpoint>().is_err());
    }
}
