use metrics::{register_counter, register_gauge, Counter, Gauge};

pub struct PolicyMetrics {
    picks_total: Counter,
    server_list_updates_total: Counter,
    stream_failures_total: Counter,
    subchannels: Gauge,
}

impl PolicyMetrics {
    pub fn new() -> Self {
        Self {
            picks_total: register_counter!("grpclb_picks_total"),
            server_list_updates_total: register_counter!("grpclb_server_list_updates_total"),
            stream_failures_total: register_counter!("grpclb_stream_failures_total"),
            subchannels: register_gauge!("grpclb_subchannels"),
        }
    }

    pub fn increment_picks(&self) {
        self.picks_total.increment(1);
    }

    pub fn record_server_list(&self, subchannels: usize) {
        self.server_list_updates_total.increment(1);
        self.subchannels.set(subchannels as f64);
    }

    pub fn increment_stream_failures(&self) {
        self.stream_failures_total.increment(1);
    }
}

impl Default for PolicyMetrics {
    fn default() -> Self {
        Self::new()
    }
}
