use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::hub::HubConfig;

/// Real-time notification hub: accepts notifications over HTTP and fans
/// them out to WebSocket subscribers.
#[derive(Parser, Debug, Clone)]
#[command(name = "notihub", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "NOTIFY_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Capacity of the queue between submissions and the broadcast pump.
    #[arg(long, env = "NOTIFY_QUEUE_CAPACITY", default_value_t = 64, value_parser = parse_capacity)]
    pub queue_capacity: usize,

    /// Per-subscriber buffer of undelivered notifications. A subscriber whose
    /// buffer fills up is disconnected.
    #[arg(long, env = "NOTIFY_SUBSCRIBER_BUFFER", default_value_t = 32, value_parser = parse_capacity)]
    pub subscriber_buffer: usize,

    /// How long a submission may wait for queue space before failing as busy.
    #[arg(long, env = "NOTIFY_SUBMIT_TIMEOUT_MS", default_value_t = 1000)]
    pub submit_timeout_ms: u64,

    /// Interval between periodic notifications; 0 disables them.
    #[arg(long, env = "NOTIFY_PERIODIC_INTERVAL_SECS", default_value_t = 5)]
    pub periodic_interval_secs: u64,

    /// How long to wait for connections to close on shutdown.
    #[arg(long, env = "NOTIFY_SHUTDOWN_GRACE_MS", default_value_t = 2000)]
    pub shutdown_grace_ms: u64,
}

fn parse_capacity(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if n == 0 {
        return Err("must be greater than zero".into());
    }
    Ok(n)
}

impl Config {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            queue_capacity: self.queue_capacity,
            submit_timeout: Duration::from_millis(self.submit_timeout_ms),
        }
    }

    /// `None` when periodic notifications are disabled.
    pub fn periodic_interval(&self) -> Option<Duration> {
        (self.periodic_interval_secs > 0).then(|| Duration::from_secs(self.periodic_interval_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
