use crate::error::{PolicyError, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

pub const DEFAULT_SCHEME: &str = "http";

/// A selectable backend address.
///
/// Identity is structural: two subchannels with the same scheme, host and port are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subchannel {
    scheme: String,
    host: String,
    port: u16,
}

impl Subchannel {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// Builds a subchannel from a raw grpclb server entry.
    ///
    /// The address must be 4 bytes (IPv4) or 16 bytes (IPv6) in network order.
    pub fn from_server(ip_address: &[u8], port: i32) -> Result<Self> {
        let ip = match ip_address.len() {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(ip_address);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(ip_address);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            len => {
                return Err(PolicyError::Protocol(format!(
                    "server address must be 4 or 16 bytes, got {len}"
                )))
            }
        };

        let port = u16::try_from(port)
            .map_err(|_| PolicyError::Protocol(format!("server port {port} is out of range")))?;

        Ok(Self::new(DEFAULT_SCHEME, ip.to_string(), port))
    }

    /// Parses an absolute URI such as `http://10.1.5.210:80`.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| PolicyError::InvalidArgument(format!("invalid subchannel uri {uri}: {e}")))?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(PolicyError::InvalidArgument(format!(
                    "subchannel uri {uri} has no host"
                )))
            }
        };
        let port = url.port_or_known_default().ok_or_else(|| {
            PolicyError::InvalidArgument(format!("subchannel uri {uri} has no port"))
        })?;
        Ok(Self::new(url.scheme(), host, port))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host without brackets, e.g. `10.1.5.211` or `fd00::1`.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Subchannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}
