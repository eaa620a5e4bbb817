#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{stream, StreamExt};
use grpclb_policy::{
    BalancerClient, BalancerConnector, BalancerEndpoint, BalancerMessage, BalancerStream,
    InitialBalancerConfig, PolicyError, Result, ServerEntry, ServerListUpdate,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

pub const SERVICE: &str = "sample-service.contoso.com";

pub type Updates = mpsc::UnboundedSender<Result<BalancerMessage>>;

/// Balancer whose stream replays a script, optionally followed by live updates.
pub struct FakeBalancer {
    releases: AtomicUsize,
    requests: Mutex<Vec<String>>,
    stream: Mutex<Option<BalancerStream>>,
}

impl FakeBalancer {
    fn with_stream(stream: BalancerStream) -> Arc<Self> {
        Arc::new(Self {
            releases: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Stream ends after `messages`.
    pub fn scripted(messages: Vec<Result<BalancerMessage>>) -> Arc<Self> {
        Self::with_stream(stream::iter(messages).boxed())
    }

    /// Stream replays `messages`, then forwards whatever is sent on the returned handle.
    pub fn live(messages: Vec<Result<BalancerMessage>>) -> (Arc<Self>, Updates) {
        let (tx, rx) = mpsc::unbounded();
        (Self::with_stream(stream::iter(messages).chain(rx).boxed()), tx)
    }

    /// Stream replays `messages`, then panics on the next poll.
    pub fn panicking(messages: Vec<Result<BalancerMessage>>) -> Arc<Self> {
        let poisoned = stream::poll_fn(|_| -> Poll<Option<Result<BalancerMessage>>> {
            panic!("balancer stream poisoned")
        });
        Self::with_stream(stream::iter(messages).chain(poisoned).boxed())
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl BalancerClient for FakeBalancer {
    async fn balance_load(&self, service_name: &str) -> Result<BalancerStream> {
        self.requests.lock().push(service_name.to_string());
        self.stream
            .lock()
            .take()
            .ok_or_else(|| PolicyError::Transport("stream already opened".to_string()))
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out queued balancers, one per connect.
#[derive(Default)]
pub struct FakeConnector {
    balancers: Mutex<VecDeque<Arc<FakeBalancer>>>,
    dialed: Mutex<Vec<BalancerEndpoint>>,
}

impl FakeConnector {
    pub fn new(balancers: Vec<Arc<FakeBalancer>>) -> Arc<Self> {
        Arc::new(Self {
            balancers: Mutex::new(balancers.into()),
            dialed: Mutex::new(Vec::new()),
        })
    }

    pub fn dialed(&self) -> Vec<BalancerEndpoint> {
        self.dialed.lock().clone()
    }
}

#[async_trait]
impl BalancerConnector for FakeConnector {
    async fn connect(&self, endpoint: &BalancerEndpoint) -> Result<Arc<dyn BalancerClient>> {
        self.dialed.lock().push(endpoint.clone());
        let balancer: Arc<dyn BalancerClient> = self
            .balancers
            .lock()
            .pop_front()
            .ok_or_else(|| PolicyError::Transport(format!("connection refused: {endpoint}")))?;
        Ok(balancer)
    }
}

pub fn initial() -> Result<BalancerMessage> {
    Ok(BalancerMessage::Initial(InitialBalancerConfig {
        report_interval: Duration::from_secs(10),
        delegate_name: String::new(),
    }))
}

pub fn server_list(addrs: &[&str]) -> Result<BalancerMessage> {
    let servers = addrs
        .iter()
        .map(|a| {
            let addr: SocketAddr = a.parse().expect("socket address");
            let ip_address = match addr {
                SocketAddr::V4(v4) => v4.ip().octets().to_vec(),
                SocketAddr::V6(v6) => v6.ip().octets().to_vec(),
            };
            ServerEntry::new(ip_address, i32::from(addr.port()))
        })
        .collect();
    Ok(BalancerMessage::ServerList(ServerListUpdate::new(servers)))
}

pub fn sample_servers() -> Result<BalancerMessage> {
    server_list(&["10.1.5.211:80", "10.1.5.212:80", "10.1.5.213:80"])
}

pub fn init_logging() {
    grpclb_policy::logging::try_init();
}
