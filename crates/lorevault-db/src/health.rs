//! Background connection-health monitoring.
//!
//! [`HealthMonitor`] probes the store on a slow fixed period and, when
//! the probe fails, drives the manager's reconnect path on a faster
//! backoff until the store answers again. Schema validation is never
//! repeated here. Repeated failures during an extended outage log at
//! most once per throttle window so an unreachable store does not flood
//! the log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::manager::LoreManager;

/// Monitor timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthMonitorConfig {
    /// Seconds between liveness probes while healthy.
    pub check_interval_secs: u64,
    /// Seconds between reconnect attempts while unhealthy.
    pub failure_backoff_secs: u64,
    /// Minimum seconds between repeated failure log lines.
    pub log_throttle_secs: u64,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            failure_backoff_secs: 30,
            log_throttle_secs: 60,
        }
    }
}

impl HealthMonitorConfig {
    /// Probe period while healthy.
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Retry period while reconnecting.
    pub const fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    /// Failure-log throttle window.
    pub const fn log_throttle(&self) -> Duration {
        Duration::from_secs(self.log_throttle_secs)
    }
}

/// Observed connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// The last probe succeeded.
    Healthy,
    /// Probes are failing; reconnect attempts are in progress.
    Reconnecting,
}

/// Suppresses duplicate log lines within a minimum interval.
struct LogThrottle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl LogThrottle {
    const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    fn should_log(&mut self) -> bool {
        let now = Instant::now();
        let due = self
            .last
            .is_none_or(|last| now.duration_since(last) >= self.min_interval);
        if due {
            self.last = Some(now);
        }
        due
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

/// Periodic liveness checker that reconnects the manager on failure.
pub struct HealthMonitor {
    manager: Arc<LoreManager>,
    config: HealthMonitorConfig,
    state_tx: watch::Sender<HealthState>,
}

impl HealthMonitor {
    /// Create a monitor for `manager`. Nothing runs until [`Self::spawn`].
    pub fn new(manager: Arc<LoreManager>, config: HealthMonitorConfig) -> Self {
        let (state_tx, _) = watch::channel(HealthState::Healthy);
        Self {
            manager,
            config,
            state_tx,
        }
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.state_tx.subscribe()
    }

    /// Start the monitor loop on the runtime.
    ///
    /// The loop runs until the returned handle is aborted or the
    /// runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                check_interval_secs = self.config.check_interval_secs,
                "Health monitor started"
            );
            let mut throttle = LogThrottle::new(self.config.log_throttle());
            loop {
                let state = *self.state_tx.borrow();
                let pause = match state {
                    HealthState::Healthy => self.config.check_interval(),
                    HealthState::Reconnecting => self.config.failure_backoff(),
                };
                tokio::time::sleep(pause).await;
                self.tick(&mut throttle).await;
            }
        })
    }

    async fn tick(&self, throttle: &mut LogThrottle) {
        if self.manager.validate_connection().await {
            if *self.state_tx.borrow() == HealthState::Reconnecting {
                tracing::info!("Store connection recovered");
                throttle.reset();
            }
            let _ = self.state_tx.send(HealthState::Healthy);
            return;
        }

        if *self.state_tx.borrow() == HealthState::Healthy {
            tracing::warn!("Store liveness probe failed, reconnecting");
        }
        let _ = self.state_tx.send(HealthState::Reconnecting);
        match self.manager.reconnect().await {
            Ok(()) => {
                tracing::info!("Store connection re-established");
                let _ = self.state_tx.send(HealthState::Healthy);
                throttle.reset();
            }
            Err(error) => {
                if throttle.should_log() {
                    tracing::error!(error = %error, "Store reconnect failed");
                }
            }
        }
    }
}
