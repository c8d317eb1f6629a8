//! Reservation lock service (component C).
//!
//! `SETNX`-style exclusivity keyed by driver, backed by `DashMap` so the
//! matching engine never needs to "hope" about a race: `reserve` either
//! wins atomically or reports the loss without mutating anything.

use crate::ids::{DriverId, RequestId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone)]
struct Hold {
    request_id: RequestId,
    expires_at: DateTime<Utc>,
}

pub struct ReservationService {
    holds: DashMap<DriverId, Hold>,
    default_ttl_sec: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveOutcome {
    pub acquired: bool,
}

impl ReservationService {
    pub fn new(default_ttl_sec: u64) -> Self {
        Self { holds: DashMap::new(), default_ttl_sec }
    }

    /// Acquires the hold on `driver_id` for `request_id` iff no live hold
    /// exists. An expired hold is treated as absent.
    pub fn reserve(
        &self,
        driver_id: DriverId,
        request_id: RequestId,
        now: DateTime<Utc>,
        ttl: Option<chrono::Duration>,
    ) -> ReserveOutcome {
        let ttl = ttl.unwrap_or_else(|| chrono::Duration::seconds(self.default_ttl_sec as i64));
        match self.holds.entry(driver_id) {
            Entry::Vacant(slot) => {
                slot.insert(Hold { request_id, expires_at: now + ttl });
                ReserveOutcome { acquired: true }
            }
            Entry::Occupied(mut slot) => {
                if slot.get().expires_at <= now {
                    slot.insert(Hold { request_id, expires_at: now + ttl });
                    ReserveOutcome { acquired: true }
                } else {
                    ReserveOutcome { acquired: false }
                }
            }
        }
    }

    /// Compare-and-delete: only the holder of `request_id` may release.
    pub fn release(&self, driver_id: DriverId, request_id: RequestId) -> bool {
        match self.holds.entry(driver_id) {
            Entry::Occupied(slot) if slot.get().request_id == request_id => {
                slot.remove();
                true
            }
            _ => false,
        }
    }

    pub fn is_reserved(&self, driver_id: DriverId, now: DateTime<Utc>) -> bool {
        self.holds
            .get(&driver_id)
            .map(|h| h.expires_at > now)
            .unwrap_or(false)
    }

    /// Background task (§10.4 `ReservationReaperTask`): proactively evicts
    /// expired holds rather than leaving them for next-access discovery.
    pub fn reap_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<DriverId> = self
            .holds
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| *e.key())
            .collect();
        for id in &expired {
            self.holds.remove(id);
        }
        expired.len()
    }
}
