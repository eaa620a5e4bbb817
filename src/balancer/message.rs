use crate::error::{PolicyError, Result};
use crate::subchannel::Subchannel;
use std::time::Duration;

/// First message on a balancer stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialBalancerConfig {
    pub report_interval: Duration,
    /// Secondary balancer to follow. Opaque; recorded but never dialed.
    pub delegate_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub ip_address: Vec<u8>,
    pub port: i32,
}

impl ServerEntry {
    pub fn new(ip_address: impl Into<Vec<u8>>, port: i32) -> Self {
        Self {
            ip_address: ip_address.into(),
            port,
        }
    }
}

/// A full replacement of the backend set, in balancer order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerListUpdate {
    pub servers: Vec<ServerEntry>,
}

impl ServerListUpdate {
    pub fn new(servers: Vec<ServerEntry>) -> Self {
        Self { servers }
    }

    /// Converts every entry; a single bad entry rejects the whole update.
    pub fn to_subchannels(&self) -> Result<Vec<Subchannel>> {
        self.servers
            .iter()
            .map(|s| Subchannel::from_server(&s.ip_address, s.port))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalancerMessage {
    Initial(InitialBalancerConfig),
    ServerList(ServerListUpdate),
    /// The balancer asked the client to use fallback backends.
    Fallback,
}

impl BalancerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            BalancerMessage::Initial(_) => "initial_response",
            BalancerMessage::ServerList(_) => "server_list",
            BalancerMessage::Fallback => "fallback_response",
        }
    }
}

pub(crate) fn unexpected(message: &BalancerMessage, expected: &str) -> PolicyError {
    PolicyError::Protocol(format!(
        "unexpected {} message, expected {}",
        message.kind(),
        expected
    ))
}
