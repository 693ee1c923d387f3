use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Source of timestamps for room mutations
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to the microsecond precision Postgres stores
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Trait for generating store-assigned room ids
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// UUID v4 id generator
pub struct UuidIdGenerator;

impl UuidIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UuidIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_has_microsecond_precision() {
        let now = SystemClock::new().now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_uuid_id_generator() {
        let generator = UuidIdGenerator::new();
        let id1 = generator.generate();
        let id2 = generator.generate();

        assert!(Uuid::parse_str(&id1).is_ok());
        assert_ne!(id1, id2);
    }
}
