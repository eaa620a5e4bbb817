use super::proto::{LoadBalanceRequest, LoadBalanceResponse, BALANCE_LOAD_PATH};
use super::{BalancerClient, BalancerConnector, BalancerMessage, BalancerStream};
use crate::config::PolicyConfig;
use crate::endpoint::BalancerEndpoint;
use crate::error::{PolicyError, Result};
use async_trait::async_trait;
use futures::{future, stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// Dials balancer endpoints over tonic.
pub struct GrpcBalancerConnector {
    connect_timeout: Duration,
}

impl GrpcBalancerConnector {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
        }
    }
}

#[async_trait]
impl BalancerConnector for GrpcBalancerConnector {
    async fn connect(&self, endpoint: &BalancerEndpoint) -> Result<Arc<dyn BalancerClient>> {
        let channel = Endpoint::from_shared(endpoint.uri())
            .map_err(|e| PolicyError::InvalidArgument(format!("invalid balancer address {endpoint}: {e}")))?
            .connect_timeout(self.connect_timeout)
            .connect()
            .await?;
        debug!(balancer = %endpoint, "Connected to balancer");
        Ok(Arc::new(GrpcBalancerClient::new(channel)))
    }
}

/// One balancer connection.
///
/// Outbound halves of `BalanceLoad` calls stay open until [`release`] so the
/// balancer keeps streaming; releasing ends them, which lets hyper finish the
/// HTTP/2 streams and drop the connection.
///
/// [`release`]: BalancerClient::release
pub struct GrpcBalancerClient {
    channel: Mutex<Option<Channel>>,
    closed: CancellationToken,
}

impl GrpcBalancerClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
            closed: CancellationToken::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait]
impl BalancerClient for GrpcBalancerClient {
    async fn balance_load(&self, service_name: &str) -> Result<BalancerStream> {
        let channel = self
            .channel
            .lock()
            .clone()
            .ok_or_else(|| PolicyError::Transport("balancer connection released".to_string()))?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready().await?;

        let request = LoadBalanceRequest::initial(service_name);
        let outbound = stream::once(future::ready(request)).chain(
            stream::once(self.closed.clone().cancelled_owned())
                .filter_map(|_| future::ready(None::<LoadBalanceRequest>)),
        );
        let codec: ProstCodec<LoadBalanceRequest, LoadBalanceResponse> = ProstCodec::default();

        let response = grpc
            .streaming(
                tonic::Request::new(outbound),
                PathAndQuery::from_static(BALANCE_LOAD_PATH),
                codec,
            )
            .await?;

        let inbound = response.into_inner().map(|item| match item {
            Ok(response) => BalancerMessage::try_from(response),
            Err(status) => Err(PolicyError::from(status)),
        });
        Ok(inbound.boxed())
    }

    fn release(&self) {
        self.channel.lock().take();
        // Half-closes every open call; hyper drops the connection once they finish.
        self.closed.cancel();
    }
}
