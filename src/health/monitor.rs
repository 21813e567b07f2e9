//! Connectivity monitor
//!
//! The protocol client's built-in reconnect logic can be fooled by
//! connections that accept bytes but never complete a handshake. This
//! monitor probes the device's API port independently on its own schedule,
//! classifies connection health, and drives teardown/recreate of the client
//! with exponential backoff once the device is classified unreachable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, Notify};

use crate::config::MonitorConfig;
use crate::error::BridgeError;
use crate::esphome::client::ClientFactory;
use crate::esphome::manager::ClientManager;
use crate::esphome::sync::StateSynchronizer;
use crate::models::{AvailabilityState, DeviceStatus};
use crate::platform::CapabilityStore;

// ============================================================================
// State machine
// ============================================================================

/// Result of one reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
}

/// What the monitor loop must do after a probe, with the next delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStep {
    /// Reachable and already online; keep the steady schedule.
    Steady { delay: Duration },
    /// Failing but below the threshold; detection window, schedule unchanged.
    Degraded { failures: u32, delay: Duration },
    /// Threshold reached: tear down the client and start the backoff.
    WentOffline { failures: u32, delay: Duration },
    /// Still unreachable while offline; backoff extended.
    StillOffline { failures: u32, delay: Duration },
    /// Reachable after being offline: recreate the client. State is only
    /// committed via `mark_recovered` once the recreate succeeds.
    Recovered { delay: Duration },
}

/// Per-device monitor state. Lives for the lifetime of the device instance;
/// reset on settings change or successful recovery.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub availability: AvailabilityState,
    pub consecutive_failures: u32,
    pub backoff: Option<Duration>,
    pub busy: bool,
    pub last_probe_at: Option<DateTime<Utc>>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            availability: AvailabilityState::Online,
            consecutive_failures: 0,
            backoff: None,
            busy: false,
            last_probe_at: None,
        }
    }

    /// Advance the state machine with one probe result.
    pub fn on_probe(&mut self, outcome: ProbeOutcome, cfg: &MonitorConfig) -> MonitorStep {
        match outcome {
            ProbeOutcome::Reachable => {
                if self.availability == AvailabilityState::Offline {
                    // Recovery has side effects that can fail; the reset is
                    // deferred to `mark_recovered`.
                    return MonitorStep::Recovered {
                        delay: cfg.probe_interval(),
                    };
                }
                self.consecutive_failures = 0;
                self.backoff = None;
                MonitorStep::Steady {
                    delay: cfg.probe_interval(),
                }
            }
            ProbeOutcome::Unreachable => {
                self.consecutive_failures += 1;
                match self.availability {
                    AvailabilityState::Online
                        if self.consecutive_failures < cfg.failure_threshold =>
                    {
                        MonitorStep::Degraded {
                            failures: self.consecutive_failures,
                            delay: cfg.probe_interval(),
                        }
                    }
                    AvailabilityState::Online => {
                        self.availability = AvailabilityState::Offline;
                        let backoff = cfg.initial_backoff();
                        self.backoff = Some(backoff);
                        MonitorStep::WentOffline {
                            failures: self.consecutive_failures,
                            delay: backoff,
                        }
                    }
                    AvailabilityState::Offline => {
                        let backoff = self.extended_backoff(cfg);
                        self.backoff = Some(backoff);
                        MonitorStep::StillOffline {
                            failures: self.consecutive_failures,
                            delay: backoff,
                        }
                    }
                }
            }
        }
    }

    /// Commit a successful recovery: back online, counters cleared.
    pub fn mark_recovered(&mut self) {
        self.availability = AvailabilityState::Online;
        self.consecutive_failures = 0;
        self.backoff = None;
    }

    /// Reschedule delay when the timer fires while a probe is in flight.
    pub fn on_timer_while_busy(&self, cfg: &MonitorConfig) -> Duration {
        cfg.busy_retry()
    }

    fn extended_backoff(&self, cfg: &MonitorConfig) -> Duration {
        let current = self.backoff.unwrap_or_else(|| cfg.initial_backoff());
        let extended = current.mul_f64(cfg.backoff_multiplier);
        extended.min(cfg.max_backoff())
    }
}

// ============================================================================
// Monitor
// ============================================================================

/// Per-device connectivity monitor that runs in the background.
pub struct ConnectivityMonitor<F: ClientFactory> {
    manager: Arc<ClientManager<F>>,
    sync: Arc<StateSynchronizer>,
    store: Arc<dyn CapabilityStore>,
    config: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    shutdown: watch::Sender<bool>,
    kick: Notify,
}

impl<F: ClientFactory> ConnectivityMonitor<F> {
    pub fn new(
        manager: Arc<ClientManager<F>>,
        sync: Arc<StateSynchronizer>,
        store: Arc<dyn CapabilityStore>,
        config: MonitorConfig,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            manager,
            sync,
            store,
            config,
            state: Arc::new(Mutex::new(MonitorState::new())),
            shutdown,
            kick: Notify::new(),
        })
    }

    /// Spawn the probe loop.
    pub fn start(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        let shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            monitor.run(shutdown).await;
        });
    }

    /// Stop the loop. No further probes fire after this; an in-flight probe
    /// is abandoned.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Reset to initial state and restart the steady schedule (settings
    /// change path).
    pub async fn reset(&self) {
        *self.state.lock().await = MonitorState::new();
        self.kick.notify_one();
        tracing::info!("[Monitor] State reset, steady schedule restarted");
    }

    /// Current snapshot for diagnostics.
    pub async fn status(&self) -> DeviceStatus {
        let state = self.state.lock().await;
        DeviceStatus {
            availability: state.availability,
            consecutive_failures: state.consecutive_failures,
            backoff_ms: state.backoff.map(|d| d.as_millis() as u64),
            probe_in_flight: state.busy,
            last_probe_at: state.last_probe_at,
        }
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "[Monitor] Starting connectivity monitor (interval: {:?})",
            self.config.probe_interval()
        );

        let mut delay = self.config.probe_interval();
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = self.kick.notified() => {
                    delay = self.config.probe_interval();
                    continue;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut state = self.state.lock().await;
                if state.busy {
                    delay = state.on_timer_while_busy(&self.config);
                    continue;
                }
                state.busy = true;
            }

            let reachable = self.manager.probe(self.config.probe_timeout()).await;

            if *shutdown.borrow() {
                // Torn down while the probe was in flight; drop the result.
                break;
            }

            let step = {
                let mut state = self.state.lock().await;
                state.busy = false;
                state.last_probe_at = Some(Utc::now());
                let outcome = if reachable {
                    ProbeOutcome::Reachable
                } else {
                    ProbeOutcome::Unreachable
                };
                state.on_probe(outcome, &self.config)
            };

            delay = self.apply(step).await;
        }

        tracing::info!("[Monitor] Stopped");
    }

    async fn apply(&self, step: MonitorStep) -> Duration {
        match step {
            MonitorStep::Steady { delay } => delay,
            MonitorStep::Degraded { failures, delay } => {
                tracing::warn!(
                    "[Monitor] Probe failed ({}/{})",
                    failures,
                    self.config.failure_threshold
                );
                self.store.set_unavailable(&format!(
                    "Connection check failed ({}/{})",
                    failures, self.config.failure_threshold
                ));
                delay
            }
            MonitorStep::WentOffline { failures, delay } => {
                tracing::warn!(
                    "[Monitor] Failure threshold reached after {} probes, tearing down client",
                    failures
                );
                // While offline the monitor owns recovery; dropping the
                // client also stops its internal reconnect attempts.
                self.manager.disconnect().await;
                self.store.set_unavailable(&format!(
                    "Device unreachable ({} consecutive failures)",
                    failures
                ));
                delay
            }
            MonitorStep::StillOffline { failures, delay } => {
                tracing::debug!(
                    "[Monitor] Device still unreachable ({} failures), next probe in {:?}",
                    failures,
                    delay
                );
                self.store.set_unavailable(&format!(
                    "Device unreachable ({} consecutive failures)",
                    failures
                ));
                delay
            }
            MonitorStep::Recovered { delay } => match self.recover().await {
                Ok(()) => {
                    self.state.lock().await.mark_recovered();
                    self.store.set_available();
                    tracing::info!("[Monitor] Device reachable again, client recreated");
                    delay
                }
                Err(e) => {
                    // Internal fault: short fixed retry, counters untouched.
                    tracing::error!("[Monitor] Recovery failed: {}", e);
                    self.config.fault_retry()
                }
            },
        }
    }

    async fn recover(&self) -> Result<(), BridgeError> {
        let client = self.manager.reconnect().await?;
        self.sync.attach(client.as_ref());
        Ok(())
    }
}
