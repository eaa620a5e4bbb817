use crate::balancer::{
    BalancerConnector, GrpcBalancerConnector, InitialBalancerConfig, Progress, StreamReader,
};
use crate::config::PolicyConfig;
use crate::endpoint::{classify, ResolvedAddress};
use crate::error::{PolicyError, Result};
use crate::lb::RoundRobin;
use crate::lifecycle::ConnectionGuard;
use crate::metrics::PolicyMetrics;
use crate::strategy::SelectionStrategy;
use crate::subchannel::Subchannel;
use crate::table::SubchannelTable;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Status of the background balancer stream.
#[derive(Debug, Clone)]
pub enum StreamState {
    /// Never activated.
    Idle,
    Streaming,
    /// The balancer closed the stream.
    Ended,
    Cancelled,
    Failed(Arc<PolicyError>),
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, StreamState::Streaming)
    }
}

struct Activation {
    connection: Arc<ConnectionGuard>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Activation {
    fn shut_down(self) -> Option<JoinHandle<()>> {
        self.cancel.cancel();
        self.connection.release();
        self.task
    }
}

/// grpclb load-balancing policy.
///
/// Discovers backends from a balancer stream and hands them out in round-robin
/// order. Selection and inspection are synchronous and lock-free; the balancer
/// stream is consumed by one background task per activation.
pub struct GrpclbPolicy {
    config: PolicyConfig,
    connector: Arc<dyn BalancerConnector>,
    table: Arc<SubchannelTable>,
    strategy: Box<dyn SelectionStrategy>,
    metrics: Arc<PolicyMetrics>,
    initial_config: RwLock<Option<InitialBalancerConfig>>,
    state: Arc<watch::Sender<StreamState>>,
    shutdown: CancellationToken,
    activation_lock: tokio::sync::Mutex<()>,
    active: Mutex<Option<Activation>>,
}

impl GrpclbPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        let connector = Arc::new(GrpcBalancerConnector::new(&config));
        Self::with_connector(config, connector)
    }

    /// Uses `connector` to reach balancers instead of the tonic transport.
    pub fn with_connector(config: PolicyConfig, connector: Arc<dyn BalancerConnector>) -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            config,
            connector,
            table: Arc::new(SubchannelTable::new()),
            strategy: Box::new(RoundRobin::new()),
            metrics: Arc::new(PolicyMetrics::new()),
            initial_config: RwLock::new(None),
            state: Arc::new(state),
            shutdown: CancellationToken::new(),
            activation_lock: tokio::sync::Mutex::new(()),
            active: Mutex::new(None),
        }
    }

    /// Connects to the first balancer in `addresses` and starts following its
    /// server lists.
    ///
    /// Returns once the initial config and the first server list have been
    /// consumed; later lists are applied in the background. Any previous
    /// activation is torn down first.
    pub async fn activate<'a>(
        &self,
        addresses: &[ResolvedAddress],
        service_name: impl Into<Option<&'a str>>,
    ) -> Result<()> {
        self.activate_with_cancellation(addresses, service_name, CancellationToken::new())
            .await
    }

    /// Like [`activate`](Self::activate), but the background stream also stops
    /// when `cancel` fires.
    pub async fn activate_with_cancellation<'a>(
        &self,
        addresses: &[ResolvedAddress],
        service_name: impl Into<Option<&'a str>>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let service_name = service_name.into();
        let endpoints = classify(addresses, service_name)?;
        let service_name = service_name.unwrap_or_default().to_string();

        let _serial = self.activation_lock.lock().await;
        if self.shutdown.is_cancelled() {
            return Err(PolicyError::Disposed);
        }

        let previous = self.active.lock().take();
        if let Some(previous) = previous {
            debug!(balancer = %previous.connection.endpoint(), "Replacing previous activation");
            if let Some(task) = previous.shut_down() {
                if let Err(e) = task.await {
                    warn!("Previous balancer stream task failed: {}", e);
                }
            }
        }

        let endpoint = endpoints[0].clone();
        if endpoints.len() > 1 {
            debug!(
                ignored = endpoints.len() - 1,
                "Using first balancer endpoint only"
            );
        }
        info!(service = %service_name, balancer = %endpoint, "Activating grpclb policy");

        let handshake = async {
            let client = self.connector.connect(&endpoint).await?;
            let connection = Arc::new(ConnectionGuard::new(client, endpoint.clone()));
            let stream = connection.balance_load(&service_name).await?;
            let mut reader = StreamReader::new(stream, self.table.clone(), self.metrics.clone());
            let initial = reader.read_initial().await?;
            let progress = reader.read_first_server_list().await?;
            Ok::<_, PolicyError>((connection, reader, initial, progress))
        };

        let timeout = self.config.handshake_timeout();
        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Err(PolicyError::Disposed),
            _ = cancel.cancelled() => Err(PolicyError::Transport("activation cancelled".to_string())),
            outcome = tokio::time::timeout(timeout, handshake) => outcome.unwrap_or_else(|_| {
                Err(PolicyError::Transport(format!(
                    "balancer handshake timed out after {}ms",
                    timeout.as_millis()
                )))
            }),
        };
        let (connection, reader, initial, progress) = outcome?;

        debug!(
            report_interval_ms = initial.report_interval.as_millis() as u64,
            delegate = %initial.delegate_name,
            "Received initial balancer config"
        );
        *self.initial_config.write() = Some(initial);

        let task_cancel = self.shutdown.child_token();
        let task = match progress {
            Progress::Ended => {
                info!("Balancer stream ended during handshake");
                self.state.send_replace(StreamState::Ended);
                None
            }
            _ => {
                info!(subchannels = self.table.len(), "grpclb policy ready");
                self.state.send_replace(StreamState::Streaming);
                let state = self.state.clone();
                let token = task_cancel.clone();
                let owned = connection.clone();
                Some(tokio::spawn(async move {
                    let outcome = tokio::select! {
                        outcome = reader.run(token) => outcome,
                        _ = cancel.cancelled() => {
                            debug!("Balancer stream cancelled by caller");
                            owned.release();
                            StreamState::Cancelled
                        }
                    };
                    state.send_replace(outcome);
                }))
            }
        };

        let activation = Activation {
            connection,
            cancel: task_cancel,
            task,
        };

        let mut active = self.active.lock();
        if self.shutdown.is_cancelled() {
            drop(active);
            activation.shut_down();
            return Err(PolicyError::Disposed);
        }
        *active = Some(activation);
        Ok(())
    }

    /// Stops the background stream and releases the balancer connection.
    ///
    /// Idempotent and safe to call concurrently or without a prior activation.
    pub fn dispose(&self) {
        self.shutdown.cancel();
        let active = self.active.lock().take();
        if let Some(activation) = active {
            info!(balancer = %activation.connection.endpoint(), "Disposing grpclb policy");
            activation.shut_down();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Next backend in round-robin order.
    pub fn next_subchannel(&self) -> Result<Subchannel> {
        let snapshot = self.table.snapshot();
        let picked = self.strategy.next_subchannel(&snapshot)?;
        self.metrics.increment_picks();
        Ok(picked)
    }

    /// The current backend set, in balancer order.
    pub fn snapshot(&self) -> Arc<Vec<Subchannel>> {
        self.table.snapshot()
    }

    /// Replaces the backend set directly, bypassing the balancer.
    pub fn set_subchannels(&self, subchannels: Vec<Subchannel>) {
        if self.state.borrow().is_streaming() {
            warn!("Overriding subchannels while a balancer stream is active");
        }
        self.metrics.record_server_list(subchannels.len());
        self.table.replace(subchannels);
    }

    /// Resolves after the next table replacement with its generation.
    ///
    /// The subscription starts when this is called, not when the future is first
    /// polled, so an update racing with the caller is not missed.
    pub fn updated(&self) -> impl Future<Output = u64> + Send + 'static {
        let mut updates = self.table.subscribe();
        async move {
            let _ = updates.changed().await;
            let generation = *updates.borrow();
            generation
        }
    }

    pub fn initial_config(&self) -> Option<InitialBalancerConfig> {
        self.initial_config.read().clone()
    }

    pub fn stream_state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Waits until the background stream is no longer running.
    pub async fn terminated(&self) -> StreamState {
        let mut states = self.state.subscribe();
        loop {
            {
                let state = states.borrow_and_update();
                if !state.is_streaming() {
                    return state.clone();
                }
            }
            if states.changed().await.is_err() {
                return self.stream_state();
            }
        }
    }
}

impl Drop for GrpclbPolicy {
    fn drop(&mut self) {
        self.dispose();
    }
}
