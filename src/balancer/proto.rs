//! Wire types for the `grpc.lb.v1` balancer service.
//!
//! Only the fields this client reads or writes are declared; prost skips the rest
//! (client stats, load-balance tokens, drop flags).

use super::message::{BalancerMessage, InitialBalancerConfig, ServerEntry, ServerListUpdate};
use crate::error::PolicyError;
use std::time::Duration;

pub const BALANCE_LOAD_PATH: &str = "/grpc.lb.v1.LoadBalancer/BalanceLoad";

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoadBalanceRequest {
    #[prost(oneof = "load_balance_request::LoadBalanceRequestType", tags = "1")]
    pub load_balance_request_type: Option<load_balance_request::LoadBalanceRequestType>,
}

pub mod load_balance_request {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum LoadBalanceRequestType {
        #[prost(message, tag = "1")]
        InitialRequest(super::InitialLoadBalanceRequest),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InitialLoadBalanceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

impl LoadBalanceRequest {
    pub fn initial(service_name: &str) -> Self {
        Self {
            load_balance_request_type: Some(
                load_balance_request::LoadBalanceRequestType::InitialRequest(
                    InitialLoadBalanceRequest {
                        name: service_name.to_string(),
                    },
                ),
            ),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoadBalanceResponse {
    #[prost(oneof = "load_balance_response::LoadBalanceResponseType", tags = "1, 2, 3")]
    pub load_balance_response_type: Option<load_balance_response::LoadBalanceResponseType>,
}

pub mod load_balance_response {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum LoadBalanceResponseType {
        #[prost(message, tag = "1")]
        InitialResponse(super::InitialLoadBalanceResponse),
        #[prost(message, tag = "2")]
        ServerList(super::ServerList),
        #[prost(message, tag = "3")]
        FallbackResponse(super::FallbackResponse),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InitialLoadBalanceResponse {
    #[prost(string, tag = "1")]
    pub load_balancer_delegate: String,
    #[prost(message, optional, tag = "2")]
    pub client_stats_report_interval: Option<prost_types::Duration>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerList {
    #[prost(message, repeated, tag = "1")]
    pub servers: Vec<Server>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Server {
    #[prost(bytes = "vec", tag = "1")]
    pub ip_address: Vec<u8>,
    #[prost(int32, tag = "2")]
    pub port: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FallbackResponse {}

fn to_duration(d: Option<prost_types::Duration>) -> Duration {
    match d {
        Some(d) if d.seconds >= 0 && d.nanos >= 0 => Duration::new(d.seconds as u64, d.nanos as u32),
        _ => Duration::ZERO,
    }
}

impl TryFrom<LoadBalanceResponse> for BalancerMessage {
    type Error = PolicyError;

    fn try_from(response: LoadBalanceResponse) -> Result<Self, Self::Error> {
        use load_balance_response::LoadBalanceResponseType as Type;

        match response.load_balance_response_type {
            Some(Type::InitialResponse(initial)) => {
                Ok(BalancerMessage::Initial(InitialBalancerConfig {
                    report_interval: to_duration(initial.client_stats_report_interval),
                    delegate_name: initial.load_balancer_delegate,
                }))
            }
            Some(Type::ServerList(list)) => Ok(BalancerMessage::ServerList(ServerListUpdate {
                servers: list
                    .servers
                    .into_iter()
                    .map(|s| ServerEntry::new(s.ip_address, s.port))
                    .collect(),
            })),
            Some(Type::FallbackResponse(_)) => Ok(BalancerMessage::Fallback),
            None => Err(PolicyError::Protocol(
                "balancer response carries no payload".to_string(),
            )),
        }
    }
}
