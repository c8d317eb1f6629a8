//! Event log storage and the pub/sub fan-out bus (component H).
//!
//! The log itself is an in-memory append-only `Vec` per trip guarded by a
//! `tokio::sync::RwLock` (held across awaits by callers that also touch
//! external collaborators). The bus is bounded per-subscriber-class
//! channels: a slow subscriber is disconnected once its channel is full
//! rather than let publishers block, matching §5's backpressure policy —
//! "must resume by reading the log" is therefore the subscriber's job, not
//! this module's.

use crate::ids::TripId;
use crate::trip::events::TripEvent;
use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};

pub struct EventLog {
    streams: DashMap<TripId, RwLock<Vec<TripEvent>>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self { streams: DashMap::new() }
    }

    /// Appends `event`, enforcing `version = max_existing + 1` for this
    /// trip. Returns the event unchanged on success.
    pub async fn append(&self, mut event: TripEvent) -> TripEvent {
        let lock = self
            .streams
            .entry(event.trip_id)
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut guard = lock.write().await;
        let next_version = guard.last().map(|e| e.version + 1).unwrap_or(1);
        event.version = next_version;
        guard.push(event.clone());
        event
    }

    pub async fn events_since(&self, trip_id: TripId, since_version: u64) -> Vec<TripEvent> {
        match self.streams.get(&trip_id) {
            Some(lock) => {
                let guard = lock.read().await;
                guard.iter().filter(|e| e.version > since_version).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub async fn all_events(&self, trip_id: TripId) -> Vec<TripEvent> {
        self.events_since(trip_id, 0).await
    }
}

/// A named channel of events fanned out to subscribers of one class (e.g.
/// "rider-notifications", "driver-notifications"). Bounded; a subscriber
/// that falls behind observes `RecvError::Lagged` and must catch up by
/// reading the log directly.
pub struct EventBus {
    sender: broadcast::Sender<TripEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: TripEvent) {
        // No receivers is a normal idle state, not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TripEvent> {
        self.sender.subscribe()
    }
}

/// Zone-level events that aren't scoped to a single trip, so they don't fit
/// `EventBus`'s per-trip `TripEvent` stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemEvent {
    SurgeSpike { geohash: String, old_mul: f64, new_mul: f64 },
}

/// Fan-out bus for `SystemEvent`, same bounded-channel backpressure policy
/// as `EventBus`.
pub struct SystemEventBus {
    sender: broadcast::Sender<SystemEvent>,
}

impl SystemEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: SystemEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use crate::ids::{RiderId, TripEventId};
    use crate::trip::events::TripEventKind;
    use crate::trip::model::ActorKind;
    use chrono::Utc;
    use std::collections::HashSet;

    fn sample_event(trip_id: TripId) -> TripEvent {
        let now = Utc::now();
        let loc = Location { lat: 0.0, lon: 0.0, accuracy_m: None, captured_at: now };
        TripEvent {
            id: TripEventId::new(),
            trip_id,
            kind: TripEventKind::TripRequested {
                rider_id: RiderId::new(),
                pickup: loc,
                destination: loc,
                requested_vehicle_type: "standard".to_string(),
                special_requirements: HashSet::new(),
            },
            actor_id: "system".to_string(),
            actor_kind: ActorKind::System,
            timestamp: now,
            version: 0,
        }
    }

    #[tokio::test]
    async fn append_assigns_contiguous_versions() {
        let log = EventLog::new();
        let trip_id = TripId::new();
        let e1 = log.append(sample_event(trip_id)).await;
        let e2 = log.append(sample_event(trip_id)).await;
        assert_eq!(e1.version, 1);
        assert_eq!(e2.version, 2);
    }

    #[tokio::test]
    async fn events_since_filters_correctly() {
        let log = EventLog::new();
        let trip_id = TripId::new();
        log.append(sample_event(trip_id)).await;
        log.append(sample_event(trip_id)).await;
        let since = log.events_since(trip_id, 1).await;
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].version, 2);
    }

    #[test]
    fn bus_publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(sample_event(TripId::new()));
    }

    #[tokio::test]
    async fn system_event_bus_delivers_surge_spikes_to_subscribers() {
        let bus = SystemEventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(SystemEvent::SurgeSpike { geohash: "9q8yy".to_string(), old_mul: 1.0, new_mul: 2.5 });
        let event = rx.recv().await.unwrap();
        assert_eq!(event, SystemEvent::SurgeSpike { geohash: "9q8yy".to_string(), old_mul: 1.0, new_mul: 2.5 });
    }
}
