// # Endpoint
//
// A validated network address a token redirects to.
//
// ## Accepted forms
//
// - `192.0.2.7`            bare IPv4
// - `192.0.2.7:8080`       IPv4 with port
// - `2001:db8::1`          bare IPv6 (any unbracketed input with 2+ colons)
// - `[2001:db8::1]`        bracketed IPv6
// - `[2001:db8::1]:8080`   IPv6 with port (brackets required)
//
// The stored value is the trimmed input, never re-formatted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::EndpointError;

/// Address used for entries that have never been registered
pub const LOOPBACK: &str = "127.0.0.1";

/// A validated IP literal with an optional port
///
/// Constructed only through [`Endpoint::parse`] (or the equivalent `FromStr`
/// and serde paths), so every value in the directory has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    raw: String,
    addr: IpAddr,
    port: Option<u16>,
}

impl Endpoint {
    /// Validate `input` and wrap the trimmed string
    ///
    /// The port is checked before the address, so `127.0.0.1:abc` reports
    /// [`EndpointError::BadPort`].
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        let raw = input.trim();
        let (addr, port) = split(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            addr,
            port,
        })
    }

    /// The loopback endpoint assigned to unregistered tokens
    pub fn loopback() -> Self {
        Self {
            raw: LOOPBACK.to_string(),
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: None,
        }
    }

    /// The endpoint exactly as stored
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The address portion
    pub fn ip(&self) -> IpAddr {
        self.addr
    }

    /// The port, if one was given
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// URL a lookup should redirect to
    ///
    /// Bare IPv6 literals are bracketed so the result is a valid URL authority.
    pub fn redirect_url(&self) -> String {
        if self.addr.is_ipv6() && !self.raw.starts_with('[') {
            format!("http://[{}]/", self.raw)
        } else {
            format!("http://{}/", self.raw)
        }
    }
}

fn split(raw: &str) -> Result<(IpAddr, Option<u16>), EndpointError> {
    if let Some(rest) = raw.strip_prefix('[') {
        let (addr, tail) = rest.split_once(']').ok_or(EndpointError::BadAddress)?;
        let port = if tail.is_empty() {
            None
        } else {
            let port = tail.strip_prefix(':').ok_or(EndpointError::BadPort)?;
            Some(parse_port(port)?)
        };
        let addr = addr
            .parse::<Ipv6Addr>()
            .map_err(|_| EndpointError::BadAddress)?;
        return Ok((IpAddr::V6(addr), port));
    }

    match raw.rsplit_once(':') {
        // Unbracketed with more than one colon: the whole thing is an address
        Some((head, _)) if head.contains(':') => Ok((parse_addr(raw)?, None)),
        Some((addr, port)) => {
            let port = parse_port(port)?;
            Ok((parse_addr(addr)?, Some(port)))
        }
        None => Ok((parse_addr(raw)?, None)),
    }
}

/// Decimal digits only; `u16::from_str` alone would also take a leading `+`
fn parse_port(port: &str) -> Result<u16, EndpointError> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EndpointError::BadPort);
    }
    port.parse::<u16>().map_err(|_| EndpointError::BadPort)
}

fn parse_addr(addr: &str) -> Result<IpAddr, EndpointError> {
    addr.parse::<IpAddr>().map_err(|_| EndpointError::BadAddress)
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::loopback()
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.raw
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
