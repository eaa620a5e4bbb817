use crate::error::{PolicyError, Result};
use std::fmt;

const SERVICE_NAME_MISSING: &str = "serviceName not defined";
const NO_BALANCER_ADDRESS: &str = "resolution result must contain at least one balancer address";

/// An address produced by name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub host: String,
    pub port: u16,
    pub is_load_balancer: bool,
}

impl ResolvedAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            is_load_balancer: false,
        }
    }

    pub fn balancer(host: impl Into<String>, port: u16) -> Self {
        Self {
            is_load_balancer: true,
            ..Self::new(host, port)
        }
    }
}

/// A resolved address that hosts the grpclb balancer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancerEndpoint {
    pub host: String,
    pub port: u16,
}

impl BalancerEndpoint {
    pub fn uri(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for BalancerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Validates the activation inputs and keeps only the balancer addresses, in input order.
pub fn classify<'a, I>(addresses: I, service_name: Option<&str>) -> Result<Vec<BalancerEndpoint>>
where
    I: IntoIterator<Item = &'a ResolvedAddress>,
{
    match service_name {
        Some(name) if !name.trim().is_empty() => {}
        _ => {
            return Err(PolicyError::InvalidArgument(
                SERVICE_NAME_MISSING.to_string(),
            ))
        }
    }

    let balancers: Vec<BalancerEndpoint> = addresses
        .into_iter()
        .filter(|a| a.is_load_balancer)
        .map(|a| BalancerEndpoint {
            host: a.host.clone(),
            port: a.port,
        })
        .collect();

    if balancers.is_empty() {
        return Err(PolicyError::InvalidArgument(
            NO_BALANCER_ADDRESS.to_string(),
        ));
    }

    Ok(balancers)
}
