use std::sync::Arc;

use chatrooms::room::{InMemoryRoomRepository, RoomMembership, RoomService};

use super::mocks::{SequenceIdGenerator, StepClock};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub repository: Arc<InMemoryRoomRepository>,
    pub room_service: Arc<RoomService>,
}

pub struct TestSetupBuilder {
    memberships: Vec<RoomMembership>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            memberships: vec![],
        }
    }

    pub fn with_membership(mut self, room_id: &str, user_id: &str) -> Self {
        self.memberships.push(RoomMembership::new(room_id, user_id));
        self
    }

    pub fn build(self) -> TestSetup {
        let repository = Arc::new(InMemoryRoomRepository::with_memberships(self.memberships));
        let room_service = Arc::new(RoomService::with_generators(
            repository.clone(),
            Arc::new(StepClock::new()),
            Arc::new(SequenceIdGenerator::new()),
        ));

        TestSetup {
            repository,
            room_service,
        }
    }
}
