//! Interface Section
//!
//! The `[Interface]` block of a tunnel config: local addresses, DNS,
//! per-app routing, the key pair and the AmneziaWG obfuscation knobs.
//!
//! Values are accumulated in an [`InterfaceBuilder`] and frozen into an
//! immutable [`Interface`] by [`InterfaceBuilder::build`]. Numeric fields
//! set to `0` are stored as absent, so a config that spells out `MTU = 0`
//! is equal to one that omits the line.

use crate::attribute::{self, Attribute};
use crate::error::{BadConfigError, Location, Reason, Section};
use crate::keys::{KeyPair, PrivateKey};
use crate::network::{self, InetNetwork, NetworkParseError};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

const MIN_UDP_PORT: i32 = 0;
const MAX_UDP_PORT: i32 = 65535;

/// Immutable `[Interface]` configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interface {
    addresses: Vec<InetNetwork>,
    dns_servers: Vec<IpAddr>,
    dns_search_domains: Vec<String>,
    excluded_applications: Vec<String>,
    included_applications: Vec<String>,
    key_pair: KeyPair,
    listen_port: Option<u16>,
    mtu: Option<u32>,
    junk_packet_count: Option<u32>,
    junk_packet_min_size: Option<u32>,
    junk_packet_max_size: Option<u32>,
    init_packet_junk_size: Option<u32>,
    response_packet_junk_size: Option<u32>,
    init_packet_magic_header: Option<u64>,
    response_packet_magic_header: Option<u64>,
    underload_packet_magic_header: Option<u64>,
    transport_packet_magic_header: Option<u64>,
}

impl Interface {
    pub fn builder() -> InterfaceBuilder {
        InterfaceBuilder::default()
    }

    /// Parse a series of `Key = Value` lines.
    ///
    /// Keys are matched case-insensitively; unknown keys are rejected.
    pub fn parse<I>(lines: I) -> Result<Self, BadConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut builder = InterfaceBuilder::default();
        for line in lines {
            let line = line.as_ref();
            let attr = Attribute::parse(line).ok_or_else(|| {
                error(Location::TopLevel, Reason::SyntaxError, Some(line))
            })?;
            let value = attr.value();

            match attr.key().to_ascii_lowercase().as_str() {
                "address" => builder.parse_addresses(value)?,
                "dns" => builder.parse_dns_servers(value)?,
                "excludedapplications" => builder.parse_excluded_applications(value),
                "includedapplications" => builder.parse_included_applications(value),
                "listenport" => builder.parse_listen_port(value)?,
                "mtu" => builder.parse_mtu(value)?,
                "privatekey" => builder.parse_private_key(value)?,
                "jc" => builder.parse_junk_packet_count(value)?,
                "jmin" => builder.parse_junk_packet_min_size(value)?,
                "jmax" => builder.parse_junk_packet_max_size(value)?,
                "s1" => builder.parse_init_packet_junk_size(value)?,
                "s2" => builder.parse_response_packet_junk_size(value)?,
                "h1" => builder.parse_init_packet_magic_header(value)?,
                "h2" => builder.parse_response_packet_magic_header(value)?,
                "h3" => builder.parse_underload_packet_magic_header(value)?,
                "h4" => builder.parse_transport_packet_magic_header(value)?,
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

    pub fn addresses(&self) -> &[InetNetwork] {
        &self.addresses
    }

    pub fn dns_servers(&self) -> &[IpAddr] {
        &self.dns_servers
    }

    pub fn dns_search_domains(&self) -> &[String] {
        &self.dns_search_domains
    }

    pub fn excluded_applications(&self) -> &[String] {
        &self.excluded_applications
    }

    pub fn included_applications(&self) -> &[String] {
        &self.included_applications
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn listen_port(&self) -> Option<u16> {
        self.listen_port
    }

    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    pub fn junk_packet_count(&self) -> Option<u32> {
        self.junk_packet_count
    }

    pub fn junk_packet_min_size(&self) -> Option<u32> {
        self.junk_packet_min_size
    }

    pub fn junk_packet_max_size(&self) -> Option<u32> {
        self.junk_packet_max_size
    }

    pub fn init_packet_junk_size(&self) -> Option<u32> {
        self.init_packet_junk_size
    }

    pub fn response_packet_junk_size(&self) -> Option<u32> {
        self.response_packet_junk_size
    }

    pub fn init_packet_magic_header(&self) -> Option<u64> {
        self.init_packet_magic_header
    }

    pub fn response_packet_magic_header(&self) -> Option<u64> {
        self.response_packet_magic_header
    }

    pub fn underload_packet_magic_header(&self) -> Option<u64> {
        self.underload_packet_magic_header
    }

    pub fn transport_packet_magic_header(&self) -> Option<u64> {
        self.transport_packet_magic_header
    }

    /// Obfuscation parameters in serialization order
    fn obfuscation(&self) -> [(Location, Option<u64>); 9] {
        [
            (Location::JunkPacketCount, self.junk_packet_count.map(u64::from)),
            (Location::JunkPacketMinSize, self.junk_packet_min_size.map(u64::from)),
            (Location::JunkPacketMaxSize, self.junk_packet_max_size.map(u64::from)),
            (Location::InitPacketJunkSize, self.init_packet_junk_size.map(u64::from)),
            (Location::ResponsePacketJunkSize, self.response_packet_junk_size.map(u64::from)),
            (Location::InitPacketMagicHeader, self.init_packet_magic_header),
            (Location::ResponsePacketMagicHeader, self.response_packet_magic_header),
            (Location::UnderloadPacketMagicHeader, self.underload_packet_magic_header),
            (Location::TransportPacketMagicHeader, self.transport_packet_magic_header),
        ]
    }

    /// Render as `Key = Value` lines for the quick tool
    pub fn to_awg_quick_string(&self) -> String {
        let mut out = String::new();
        if !self.addresses.is_empty() {
            out.push_str(&format!("Address = {}\n", attribute::join(&self.addresses)));
        }
        if !self.dns_servers.is_empty() || !self.dns_search_domains.is_empty() {
            let entries = self
                .dns_servers
                .iter()
                .map(IpAddr::to_string)
                .chain(self.dns_search_domains.iter().cloned());
            out.push_str(&format!("DNS = {}\n", attribute::join(entries)));
        }
        if !self.excluded_applications.is_empty() {
            out.push_str(&format!(
                "ExcludedApplications = {}\n",
                attribute::join(&self.excluded_applications)
            ));
        }
        if !self.included_applications.is_empty() {
            out.push_str(&format!(
                "IncludedApplications = {}\n",
                attribute::join(&self.included_applications)
            ));
        }
        if let Some(port) = self.listen_port {
            out.push_str(&format!("ListenPort = {port}\n"));
        }
        if let Some(mtu) = self.mtu {
            out.push_str(&format!("MTU = {mtu}\n"));
        }
        for (location, value) in self.obfuscation() {
            if let Some(value) = value {
                out.push_str(&format!("{} = {value}\n", location.name()));
            }
        }
        out.push_str(&format!(
            "PrivateKey = {}\n",
            self.key_pair.private_key().to_base64()
        ));
        out
    }

    /// Render as `key=value` lines for the engine's configuration channel.
    ///
    /// Addresses, DNS and application lists are applied elsewhere and are
    /// not part of this form.
    pub fn to_awg_userspace_string(&self) -> String {
        let mut out = format!("private_key={}\n", self.key_pair.private_key().to_hex());
        if let Some(port) = self.listen_port {
            out.push_str(&format!("listen_port={port}\n"));
        }
        for (location, value) in self.obfuscation() {
            if let Some(value) = value {
                out.push_str(&format!("{}={value}\n", location.name().to_ascii_lowercase()));
            }
        }
        out
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Interface {}", self.key_pair.public_key().to_base64())?;
        if let Some(port) = self.listen_port {
            write!(f, " @{port}")?;
        }
        f.write_str(")")
    }
}

fn error(location: Location, reason: impl Into<Reason>, text: Option<&str>) -> BadConfigError {
    BadConfigError::new(
        Section::Interface,
        location,
        reason,
        text.map(str::to_string),
    )
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn parse_number<T: FromStr>(value: &str, location: Location) -> Result<T, BadConfigError> {
    value
        .parse::<T>()
        .map_err(|_| error(location, Reason::InvalidNumber, Some(value)))
}

/// Reject negatives and collapse zero to "unset"
fn non_zero<T, U>(value: T, location: Location) -> Result<Option<U>, BadConfigError>
where
    T: Copy + Default + PartialOrd + fmt::Display,
    U: TryFrom<T>,
{
    if value < T::default() {
        return Err(error(location, Reason::InvalidValue, Some(value.to_string().as_str())));
    }
    if value == T::default() {
        return Ok(None);
    }
    U::try_from(value)
        .map(Some)
        .map_err(|_| error(location, Reason::InvalidValue, Some(value.to_string().as_str())))
}

/// Mutable accumulator for an [`Interface`]
///
/// The builder can be reused after [`build`](Self::build); already built
/// values own their own copies of every collection.
#[derive(Debug, Clone, Default)]
pub struct InterfaceBuilder {
    addresses: Vec<InetNetwork>,
    dns_servers: Vec<IpAddr>,
    dns_search_domains: Vec<String>,
    excluded_applications: Vec<String>,
    included_applications: Vec<String>,
    // No default; must be provided before building.
    key_pair: Option<KeyPair>,
    listen_port: Option<u16>,
    mtu: Option<u32>,
    junk_packet_count: Option<u32>,
    junk_packet_min_size: Option<u32>,
    junk_packet_max_size: Option<u32>,
    init_packet_junk_size: Option<u32>,
    response_packet_junk_size: Option<u32>,
    init_packet_magic_header: Option<u64>,
    response_packet_magic_header: Option<u64>,
    underload_packet_magic_header: Option<u64>,
    transport_packet_magic_header: Option<u64>,
}

impl InterfaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and freeze the accumulated values
    pub fn build(&self) -> Result<Interface, BadConfigError> {
        let key_pair = self
            .key_pair
            .clone()
            .ok_or_else(|| error(Location::PrivateKey, Reason::MissingAttribute, None))?;
        if !self.included_applications.is_empty() && !self.excluded_applications.is_empty() {
            return Err(error(Location::IncludedApplications, Reason::InvalidKey, None));
        }

        Ok(Interface {
            addresses: self.addresses.clone(),
            dns_servers: self.dns_servers.clone(),
            dns_search_domains: self.dns_search_domains.clone(),
            excluded_applications: self.excluded_applications.clone(),
            included_applications: self.included_applications.clone(),
            key_pair,
            listen_port: self.listen_port,
            mtu: self.mtu,
            junk_packet_count: self.junk_packet_count,
            junk_packet_min_size: self.junk_packet_min_size,
            junk_packet_max_size: self.junk_packet_max_size,
            init_packet_junk_size: self.init_packet_junk_size,
            response_packet_junk_size: self.response_packet_junk_size,
            init_packet_magic_header: self.init_packet_magic_header,
            response_packet_magic_header: self.response_packet_magic_header,
            underload_packet_magic_header: self.underload_packet_magic_header,
            transport_packet_magic_header: self.transport_packet_magic_header,
        })
    }

    pub fn add_address(&mut self, address: InetNetwork) -> &mut Self {
        push_unique(&mut self.addresses, address);
        self
    }

    pub fn add_dns_server(&mut self, server: IpAddr) -> &mut Self {
        push_unique(&mut self.dns_servers, server);
        self
    }

    pub fn add_dns_search_domain(&mut self, domain: impl Into<String>) -> &mut Self {
        push_unique(&mut self.dns_search_domains, domain.into());
        self
    }

    pub fn exclude_application(&mut self, application: impl Into<String>) -> &mut Self {
        push_unique(&mut self.excluded_applications, application.into());
        self
    }

    pub fn include_application(&mut self, application: impl Into<String>) -> &mut Self {
        push_unique(&mut self.included_applications, application.into());
        self
    }

    pub fn set_key_pair(&mut self, key_pair: KeyPair) -> &mut Self {
        self.key_pair = Some(key_pair);
        self
    }

    pub fn set_listen_port(&mut self, port: i32) -> Result<&mut Self, BadConfigError> {
        if !(MIN_UDP_PORT..=MAX_UDP_PORT).contains(&port) {
            return Err(error(Location::ListenPort, Reason::InvalidValue, Some(port.to_string().as_str())));
        }
        self.listen_port = non_zero(port, Location::ListenPort)?;
        Ok(self)
    }

    pub fn set_mtu(&mut self, mtu: i32) -> Result<&mut Self, BadConfigError> {
        self.mtu = non_zero(mtu, Location::Mtu)?;
        Ok(self)
    }

    pub fn set_junk_packet_count(&mut self, value: i32) -> Result<&mut Self, BadConfigError> {
        self.junk_packet_count = non_zero(value, Location::JunkPacketCount)?;
        Ok(self)
    }

    pub fn set_junk_packet_min_size(&mut self, value: i32) -> Result<&mut Self, BadConfigError> {
        self.junk_packet_min_size = non_zero(value, Location::JunkPacketMinSize)?;
        Ok(self)
    }

    pub fn set_junk_packet_max_size(&mut self, value: i32) -> Result<&mut Self, BadConfigError> {
        self.junk_packet_max_size = non_zero(value, Location::JunkPacketMaxSize)?;
        Ok(self)
    }

    pub fn set_init_packet_junk_size(&mut self, value: i32) -> Result<&mut Self, BadConfigError> {
        self.init_packet_junk_size = non_zero(value, Location::InitPacketJunkSize)?;
        Ok(self)
    }

    pub fn set_response_packet_junk_size(&mut self, value: i32) -> Result<&mut Self, BadConfigError> {
        self.response_packet_junk_size = non_zero(value, Location::ResponsePacketJunkSize)?;
        Ok(self)
    }

    pub fn set_init_packet_magic_header(&mut self, value: i64) -> Result<&mut Self, BadConfigError> {
        self.init_packet_magic_header = non_zero(value, Location::InitPacketMagicHeader)?;
        Ok(self)
    }

    pub fn set_response_packet_magic_header(&mut self, value: i64) -> Result<&mut Self, BadConfigError> {
        self.response_packet_magic_header = non_zero(value, Location::ResponsePacketMagicHeader)?;
        Ok(self)
    }

    pub fn set_underload_packet_magic_header(&mut self, value: i64) -> Result<&mut Self, BadConfigError> {
        self.underload_packet_magic_header = non_zero(value, Location::UnderloadPacketMagicHeader)?;
        Ok(self)
    }

    pub fn set_transport_packet_magic_header(&mut self, value: i64) -> Result<&mut Self, BadConfigError> {
        self.transport_packet_magic_header = non_zero(value, Location::TransportPacketMagicHeader)?;
        Ok(self)
    }

    pub fn parse_addresses(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        for token in attribute::split(value) {
            let address = token
                .parse::<InetNetwork>()
                .map_err(|e| error(Location::Address, e, Some(token.as_str())))?;
            self.add_address(address);
        }
        Ok(self)
    }

    /// Tokens that are not IP literals but are valid hostnames become
    /// search domains; a token that merely looks like a broken literal
    /// (e.g. `999.999.999.999`) is rejected.
    pub fn parse_dns_servers(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        for token in attribute::split(value) {
            match network::parse_ip_literal(&token) {
                Ok(server) => {
                    self.add_dns_server(server);
                }
                Err(NetworkParseError::NotAnAddress(_)) if network::is_hostname(&token) => {
                    self.add_dns_search_domain(token);
                }
                Err(e) => return Err(error(Location::Dns, e, Some(token.as_str()))),
            }
        }
        Ok(self)
    }

    pub fn parse_excluded_applications(&mut self, value: &str) -> &mut Self {
        for app in attribute::split(value) {
            self.exclude_application(app);
        }
        self
    }

    pub fn parse_included_applications(&mut self, value: &str) -> &mut Self {
        for app in attribute::split(value) {
            self.include_application(app);
        }
        self
    }

    pub fn parse_listen_port(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_listen_port(parse_number(value, Location::ListenPort)?)
    }

    pub fn parse_mtu(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_mtu(parse_number(value, Location::Mtu)?)
    }

    pub fn parse_junk_packet_count(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_junk_packet_count(parse_number(value, Location::JunkPacketCount)?)
    }

    pub fn parse_junk_packet_min_size(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_junk_packet_min_size(parse_number(value, Location::JunkPacketMinSize)?)
    }

    pub fn parse_junk_packet_max_size(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_junk_packet_max_size(parse_number(value, Location::JunkPacketMaxSize)?)
    }

    pub fn parse_init_packet_junk_size(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_init_packet_junk_size(parse_number(value, Location::InitPacketJunkSize)?)
    }

    pub fn parse_response_packet_junk_size(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_response_packet_junk_size(parse_number(value, Location::ResponsePacketJunkSize)?)
    }

    pub fn parse_init_packet_magic_header(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_init_packet_magic_header(parse_number(value, Location::InitPacketMagicHeader)?)
    }

    pub fn parse_response_packet_magic_header(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_response_packet_magic_header(parse_number(value, Location::ResponsePacketMagicHeader)?)
    }

    pub fn parse_underload_packet_magic_header(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_underload_packet_magic_header(parse_number(value, Location::UnderloadPacketMagicHeader)?)
    }

    pub fn parse_transport_packet_magic_header(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        self.set_transport_packet_magic_header(parse_number(value, Location::TransportPacketMagicHeader)?)
    }

    pub fn parse_private_key(&mut self, value: &str) -> Result<&mut Self, BadConfigError> {
        let key = PrivateKey::from_base64(value).map_err(|e| error(Location::PrivateKey, e, None))?;
        Ok(self.set_key_pair(KeyPair::from_private(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = "dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo=";
    const PUBLIC_KEY: &str = "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=";

    fn parse(lines: &[&str]) -> Result<Interface, BadConfigError> {
        Interface::parse(lines.iter().copied())
    }

    fn with_key(lines: &[&str]) -> Result<Interface, BadConfigError> {
        let key_line = format!("PrivateKey = {PRIVATE_KEY}");
        let mut all: Vec<&str> = lines.to_vec();
        all.push(&key_line);
        Interface::parse(all)
    }

    #[test]
    fn test_parse_full_interface() {
        let iface = with_key(&[
            "Address = 10.0.0.2/32, fd00::2/128, 10.0.0.2/32",
            "dns = 1.1.1.1, corp.example.com",
            "ExcludedApplications = com.example.bank",
            "ListenPort = 51820",
            "MTU = 1280",
            "Jc = 4",
            "Jmin = 40",
            "Jmax = 70",
            "S1 = 15",
            "S2 = 18",
            "H1 = 1234567891",
            "H2 = 1234567892",
            "H3 = 1234567893",
            "H4 = 4294967295",
        ])
        .unwrap();

        assert_eq!(iface.addresses().len(), 2);
        assert_eq!(iface.dns_servers(), &["1.1.1.1".parse::<IpAddr>().unwrap()]);
        assert_eq!(iface.dns_search_domains(), &["corp.example.com".to_string()]);
        assert_eq!(iface.excluded_applications(), &["com.example.bank".to_string()]);
        assert_eq!(iface.listen_port(), Some(51820));
        assert_eq!(iface.mtu(), Some(1280));
        assert_eq!(iface.junk_packet_count(), Some(4));
        assert_eq!(iface.response_packet_junk_size(), Some(18));
        assert_eq!(iface.transport_packet_magic_header(), Some(4294967295));
        assert_eq!(iface.key_pair().public_key().to_base64(), PUBLIC_KEY);
    }

    #[test]
    fn test_roundtrip_quick_string() {
        let iface = with_key(&[
            "Address = 10.0.0.2/32, fd00::2/128",
            "DNS = 1.1.1.1, 2606:4700:4700::1111, example.com",
            "IncludedApplications = org.example.browser, org.example.mail",
            "ListenPort = 51820",
            "Jc = 3",
            "H1 = 5",
        ])
        .unwrap();

        let text = iface.to_awg_quick_string();
        let reparsed = Interface::parse(text.lines()).unwrap();
        assert_eq!(iface, reparsed);
    }

    #[test]
    fn test_quick_string_field_order() {
        let iface = with_key(&[
            "H4 = 9",
            "MTU = 1420",
            "Jc = 2",
            "Address = 10.0.0.2/24",
            "DNS = example.com",
        ])
        .unwrap();

        assert_eq!(
            iface.to_awg_quick_string(),
            format!(
                "Address = 10.0.0.2/24\nDNS = example.com\nMTU = 1420\nJc = 2\nH4 = 9\nPrivateKey = {PRIVATE_KEY}\n"
            )
        );
    }

    #[test]
    fn test_userspace_string() {
        let iface = with_key(&["ListenPort = 51820", "Address = 10.0.0.2/32", "Jmin = 40", "H2 = 7"]).unwrap();
        assert_eq!(
            iface.to_awg_userspace_string(),
            "private_key=77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a\n\
             listen_port=51820\n\
             jmin=40\n\
             h2=7\n"
        );
    }

    #[test]
    fn test_display_shows_public_key_only() {
        let iface = with_key(&["ListenPort = 51820"]).unwrap();
        assert_eq!(iface.to_string(), format!("(Interface {PUBLIC_KEY} @51820)"));

        let no_port = with_key(&[]).unwrap();
        assert_eq!(no_port.to_string(), format!("(Interface {PUBLIC_KEY})"));
        assert!(!format!("{no_port:?}").contains(PRIVATE_KEY));
    }

    #[test]
    fn test_unknown_attribute() {
        let err = with_key(&["Foo = bar"]).unwrap_err();
        assert_eq!(err.reason, Reason::UnknownAttribute);
        assert_eq!(err.text.as_deref(), Some("Foo"));
    }

    #[test]
    fn test_syntax_error_carries_line() {
        let err = with_key(&["ListenPort 51820"]).unwrap_err();
        assert_eq!(err.reason, Reason::SyntaxError);
        assert_eq!(err.location, Location::TopLevel);
        assert_eq!(err.text.as_deref(), Some("ListenPort 51820"));
    }

    #[test]
    fn test_missing_private_key() {
        let err = parse(&["ListenPort = 51820"]).unwrap_err();
        assert_eq!(err.reason, Reason::MissingAttribute);
        assert_eq!(err.location, Location::PrivateKey);
    }

    #[test]
    fn test_included_and_excluded_applications_conflict() {
        let err = with_key(&[
            "IncludedApplications = a.b.c",
            "ExcludedApplications = x.y.z",
        ])
        .unwrap_err();
        assert_eq!(err.reason, Reason::InvalidKey);
        assert_eq!(err.location, Location::IncludedApplications);
    }

    #[test]
    fn test_listen_port_bounds() {
        for bad in ["70000", "-1"] {
            let line = format!("ListenPort = {bad}");
            let err = with_key(&[line.as_str()]).unwrap_err();
            assert_eq!(err.reason, Reason::InvalidValue);
            assert_eq!(err.text.as_deref(), Some(bad));
        }

        let iface = with_key(&["ListenPort = 0"]).unwrap();
        assert_eq!(iface.listen_port(), None);
    }

    #[test]
    fn test_non_numeric_value() {
        let err = with_key(&["MTU = big"]).unwrap_err();
        assert_eq!(err.reason, Reason::InvalidNumber);
        assert_eq!(err.location, Location::Mtu);
        assert_eq!(err.text.as_deref(), Some("big"));
    }

    #[test]
    fn test_negative_sizes_rejected_and_zero_collapses() {
        let err = with_key(&["Jmax = -5"]).unwrap_err();
        assert_eq!(err.reason, Reason::InvalidValue);
        assert_eq!(err.location, Location::JunkPacketMaxSize);

        let err = with_key(&["H3 = -1"]).unwrap_err();
        assert_eq!(err.location, Location::UnderloadPacketMagicHeader);

        let zeroed = with_key(&["MTU = 0", "Jc = 0", "H1 = 0"]).unwrap();
        assert_eq!(zeroed, with_key(&[]).unwrap());
    }

    #[test]
    fn test_dns_rejects_malformed_literal() {
        let err = with_key(&["DNS = 1.2.3.4, example.com, 999.999.999.999"]).unwrap_err();
        assert_eq!(err.location, Location::Dns);
        assert!(matches!(err.reason, Reason::InvalidAddress(_)));

        let iface = with_key(&["DNS = 1.2.3.4, example.com"]).unwrap();
        assert_eq!(iface.dns_servers().len(), 1);
        assert_eq!(iface.dns_search_domains().len(), 1);
    }

    #[test]
    fn test_dns_rejects_invalid_hostname() {
        let err = with_key(&["DNS = not_a_host!"]).unwrap_err();
        assert_eq!(err.location, Location::Dns);

        let err = with_key(&["DNS = 1.2.3.4.example"]).unwrap_err();
        assert_eq!(err.location, Location::Dns);
        assert_eq!(err.text.as_deref(), Some("1.2.3.4.example"));
    }

    #[test]
    fn test_bad_address_and_key() {
        let err = with_key(&["Address = 10.0.0.300/24"]).unwrap_err();
        assert_eq!(err.location, Location::Address);

        let err = parse(&["PrivateKey = short"]).unwrap_err();
        assert_eq!(err.location, Location::PrivateKey);
        assert!(matches!(err.reason, Reason::InvalidKeyFormat(_)));
    }

    #[test]
    fn test_builder_reuse_does_not_affect_built_value() {
        let mut builder = InterfaceBuilder::new();
        builder
            .set_key_pair(KeyPair::generate())
            .add_address("10.0.0.2/32".parse().unwrap());
        let first = builder.build().unwrap();

        builder.add_address("10.0.0.3/32".parse().unwrap());
        let second = builder.build().unwrap();

        assert_eq!(first.addresses().len(), 1);
        assert_eq!(second.addresses().len(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let key_line = format!("PRIVATEKEY = {PRIVATE_KEY}");
        let iface = parse(&[key_line.as_str(), "listenport = 1"]).unwrap();
        assert_eq!(iface.listen_port(), Some(1));
    }
}
