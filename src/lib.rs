//! Client-side grpclb load balancing.
//!
//! A [`GrpclbPolicy`] takes the resolved addresses of a service, talks to the
//! first address marked as a balancer over the `grpc.lb.v1` streaming protocol,
//! and keeps a table of live backends that callers pick from in round-robin order.

pub mod balancer;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod lb;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod strategy;
pub mod subchannel;
pub mod table;

pub use balancer::{
    BalancerClient, BalancerConnector, BalancerMessage, BalancerStream, InitialBalancerConfig,
    ServerEntry, ServerListUpdate,
};
pub use config::PolicyConfig;
pub use endpoint::{classify, BalancerEndpoint, ResolvedAddress};
pub use error::{PolicyError, Result};
pub use metrics::PolicyMetrics;
pub use policy::{GrpclbPolicy, StreamState};
pub use strategy::SelectionStrategy;
pub use subchannel::Subchannel;
pub use table::SubchannelTable;
