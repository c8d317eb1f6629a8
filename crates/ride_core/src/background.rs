//! Background tick supervision (§9, §10.4).
//!
//! Generalizes the teacher-pack's `JobScheduler`/`Job` trait (named,
//! periodic, independently lifecycled tasks) from a `watch`-channel
//! shutdown signal to a `CancellationToken` per task, matching the spec's
//! "first-class named tasks with their own cancellation tokens, not
//! anonymous timers".

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[async_trait]
pub trait BackgroundTask: Send + Sync {
    fn name(&self) -> &'static str;
    fn interval(&self) -> Duration;
    async fn tick(&self) -> Result<(), String>;
}

pub struct TaskSupervisor {
    root_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self { root_token: CancellationToken::new(), handles: Vec::new() }
    }

    pub fn spawn<T: BackgroundTask + 'static>(&mut self, task: Arc<T>) {
        let token = self.root_token.child_token();
        let name = task.name();
        let mut interval = tokio::time::interval(task.interval());

        let handle = tokio::spawn(async move {
            info!(task = name, "background task starting");
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = task.tick().await {
                            error!(task = name, error = %e, "background task tick failed");
                        }
                    }
                    _ = token.cancelled() => {
                        info!(task = name, "background task cancelled");
                        break;
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    pub fn cancel_all(&self) {
        self.root_token.cancel();
    }

    pub async fn join_all(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

pub struct StaleSweepTask {
    pub index: Arc<crate::dispatch::DriverIndex>,
    pub clock: crate::clock::SharedClock,
    pub interval: Duration,
}

#[async_trait]
impl BackgroundTask for StaleSweepTask {
    fn name(&self) -> &'static str {
        "stale_sweep"
    }
    fn interval(&self) -> Duration {
        self.interval
    }
    async fn tick(&self) -> Result<(), String> {
        let swept = self.index.stale_sweep(self.clock.now());
        if swept > 0 {
            info!(count = swept, "swept stale drivers offline");
        }
        Ok(())
    }
}

pub struct ReservationReaperTask {
    pub reservation: Arc<crate::dispatch::ReservationService>,
    pub clock: crate::clock::SharedClock,
    pub interval: Duration,
}

#[async_trait]
impl BackgroundTask for ReservationReaperTask {
    fn name(&self) -> &'static str {
        "reservation_reaper"
    }
    fn interval(&self) -> Duration {
        self.interval
    }
    async fn tick(&self) -> Result<(), String> {
        self.reservation.reap_expired(self.clock.now());
        Ok(())
    }
}

pub struct ConfirmationTimeoutTask {
    pub orchestrator: Arc<crate::trip::TripOrchestrator>,
    pub interval: Duration,
}

#[async_trait]
impl BackgroundTask for ConfirmationTimeoutTask {
    fn name(&self) -> &'static str {
        "confirmation_timeout"
    }
    fn interval(&self) -> Duration {
        self.interval
    }
    async fn tick(&self) -> Result<(), String> {
        self.orchestrator.sweep_confirmation_timeouts().await;
        Ok(())
    }
}

/// Drives the surge engine's periodic zone recomputation (§4.D). Demand and
/// supply snapshots are supplied by a closure over the orchestrator/driver
/// index rather than baked into this task, keeping the surge engine itself
/// free of a dependency on the trip aggregate store.
pub struct SurgeTickTask<F>
where
    F: Fn() -> (std::collections::HashMap<String, u32>, std::collections::HashMap<String, u32>) + Send + Sync,
{
    pub surge: Arc<crate::surge::SurgeEngine>,
    pub bus: Arc<crate::bus::SystemEventBus>,
    pub clock: crate::clock::SharedClock,
    pub interval: Duration,
    pub snapshot: F,
}

#[async_trait]
impl<F> BackgroundTask for SurgeTickTask<F>
where
    F: Fn() -> (std::collections::HashMap<String, u32>, std::collections::HashMap<String, u32>) + Send + Sync,
{
    fn name(&self) -> &'static str {
        "surge_tick"
    }
    fn interval(&self) -> Duration {
        self.interval
    }
    async fn tick(&self) -> Result<(), String> {
        let (requests, drivers) = (self.snapshot)();
        let updates = self.surge.tick(&requests, &drivers, self.clock.now());
        for update in updates {
            if crate::surge::SurgeEngine::is_spike(update.old_multiplier, update.new_multiplier) {
                info!(
                    geohash = %update.geohash,
                    old = ?update.old_multiplier,
                    new = update.new_multiplier,
                    "surge spike"
                );
                self.bus.publish(crate::bus::SystemEvent::SurgeSpike {
                    geohash: update.geohash.clone(),
                    old_mul: update.old_multiplier.unwrap_or(1.0),
                    new_mul: update.new_multiplier,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{SystemEvent, SystemEventBus};
    use crate::clock::FixedClock;
    use crate::config::SurgeConfig;
    use crate::surge::SurgeEngine;
    use std::collections::HashMap;

    #[tokio::test]
    async fn surge_tick_task_publishes_a_spike_event() {
        let surge = Arc::new(SurgeEngine::new(SurgeConfig::default()));
        let bus = Arc::new(SystemEventBus::new(16));
        let mut rx = bus.subscribe();
        let clock: crate::clock::SharedClock = Arc::new(FixedClock::new(chrono::Utc::now()));

        let mut requests = HashMap::new();
        requests.insert("9q8yyk".to_string(), 20u32);
        let mut drivers = HashMap::new();
        drivers.insert("9q8yyk".to_string(), 1u32);

        let task = SurgeTickTask {
            surge,
            bus,
            clock,
            interval: Duration::from_secs(5),
            snapshot: move || (requests.clone(), drivers.clone()),
        };
        task.tick().await.unwrap();

        let event = rx.try_recv().expect("spike should have been published");
        match event {
            SystemEvent::SurgeSpike { geohash, new_mul, .. } => {
                assert_eq!(geohash, "9q8yyk");
                assert!(new_mul > 2.0);
            }
        }
    }
}
