//! Client side of the grpclb balancer protocol.
//!
//! ```text
//! BalancerConnector::connect(endpoint) → BalancerClient
//!     → balance_load(service_name)   writes InitialLoadBalanceRequest
//!     → BalancerStream               initial_response, server_list, server_list, ...
//!     → StreamReader                 converts and publishes into SubchannelTable
//! ```

mod grpc;
mod message;
pub mod proto;
mod reader;

pub use grpc::{GrpcBalancerClient, GrpcBalancerConnector};
pub use message::{BalancerMessage, InitialBalancerConfig, ServerEntry, ServerListUpdate};
pub(crate) use reader::{Progress, StreamReader};

use crate::endpoint::BalancerEndpoint;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Inbound half of a `BalanceLoad` call.
pub type BalancerStream = BoxStream<'static, Result<BalancerMessage>>;

/// A connection to one balancer endpoint.
#[async_trait]
pub trait BalancerClient: Send + Sync {
    /// Opens the bidirectional `BalanceLoad` stream and writes the single initial
    /// request naming `service_name`. The outbound half stays open until the
    /// returned stream is dropped.
    async fn balance_load(&self, service_name: &str) -> Result<BalancerStream>;

    /// Releases the underlying connection. The policy calls this exactly once.
    fn release(&self);
}

#[async_trait]
pub trait BalancerConnector: Send + Sync {
    async fn connect(&self, endpoint: &BalancerEndpoint) -> Result<Arc<dyn BalancerClient>>;
}
