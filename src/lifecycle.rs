use crate::balancer::BalancerClient;
use crate::endpoint::BalancerEndpoint;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Owns one balancer connection and releases it exactly once, either through
/// [`ConnectionGuard::release`] or on drop.
pub struct ConnectionGuard {
    client: Arc<dyn BalancerClient>,
    endpoint: BalancerEndpoint,
    released: AtomicBool,
}

impl ConnectionGuard {
    pub fn new(client: Arc<dyn BalancerClient>, endpoint: BalancerEndpoint) -> Self {
        Self {
            client,
            endpoint,
            released: AtomicBool::new(false),
        }
    }

    pub fn endpoint(&self) -> &BalancerEndpoint {
        &self.endpoint
    }

    /// Returns true if this call performed the release.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.client.release();
        debug!(balancer = %self.endpoint, "Released balancer connection");
        true
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn BalancerClient;
    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
