use super::message::unexpected;
use super::{BalancerMessage, BalancerStream, InitialBalancerConfig};
use crate::error::{PolicyError, Result};
use crate::metrics::PolicyMetrics;
use crate::policy::StreamState;
use crate::table::SubchannelTable;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of reading one message after the initial config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Published(usize),
    Skipped,
    Ended,
}

/// Consumes one balancer stream and feeds the subchannel table.
pub(crate) struct StreamReader {
    stream: BalancerStream,
    table: Arc<SubchannelTable>,
    metrics: Arc<PolicyMetrics>,
}

impl StreamReader {
    pub fn new(stream: BalancerStream, table: Arc<SubchannelTable>, metrics: Arc<PolicyMetrics>) -> Self {
        Self {
            stream,
            table,
            metrics,
        }
    }

    pub async fn read_initial(&mut self) -> Result<InitialBalancerConfig> {
        match self.stream.next().await {
            Some(Ok(BalancerMessage::Initial(config))) => Ok(config),
            Some(Ok(other)) => Err(unexpected(&other, "initial_response")),
            Some(Err(e)) => Err(e),
            None => Err(PolicyError::Protocol(
                "balancer stream closed before initial response".to_string(),
            )),
        }
    }

    pub async fn step(&mut self) -> Result<Progress> {
        let message = match self.stream.next().await {
            Some(message) => message?,
            None => return Ok(Progress::Ended),
        };

        match message {
            BalancerMessage::ServerList(update) => {
                let subchannels = update.to_subchannels()?;
                let count = subchannels.len();
                self.table.replace(subchannels);
                self.metrics.record_server_list(count);
                debug!(subchannels = count, "Published server list");
                Ok(Progress::Published(count))
            }
            BalancerMessage::Fallback => {
                warn!("Balancer requested fallback, keeping current subchannels");
                Ok(Progress::Skipped)
            }
            other @ BalancerMessage::Initial(_) => Err(unexpected(&other, "server_list")),
        }
    }

    /// Reads until the first server list is published or the stream ends.
    pub async fn read_first_server_list(&mut self) -> Result<Progress> {
        loop {
            match self.step().await? {
                Progress::Skipped => continue,
                progress => return Ok(progress),
            }
        }
    }

    /// Reads updates until the stream ends, fails, or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> StreamState {
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Balancer stream cancelled");
                    return StreamState::Cancelled;
                }
                step = self.step() => step,
            };

            match step {
                Ok(Progress::Ended) => {
                    info!(
                        subchannels = self.table.len(),
                        "Balancer stream ended, keeping last server list"
                    );
                    return StreamState::Ended;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Balancer stream failed: {}", e);
                    self.metrics.increment_stream_failures();
                    return StreamState::Failed(Arc::new(e));
                }
            }
        }
    }
}
