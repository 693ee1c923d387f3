use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chatrooms::room::generators::{Clock, IdGenerator};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Clock that moves forward one second every time it is read
pub struct StepClock {
    ticks: AtomicI64,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            ticks: AtomicI64::new(0),
        }
    }

    pub fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        Self::epoch() + Duration::seconds(tick)
    }
}

/// Hands out `room-1`, `room-2`, ...
pub struct SequenceIdGenerator {
    next: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(&self) -> String {
        format!("room-{}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}
