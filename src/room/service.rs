use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    generators::{Clock, IdGenerator, SystemClock, UuidIdGenerator},
    models::{NewRoom, Room, RoomChanges},
    repository::RoomRepository,
};
use crate::shared::AppError;

/// Service for handling room business logic
///
/// Holds no locks or caches of its own; concurrent callers are kept consistent
/// by the repository's uniqueness guarantees.
pub struct RoomService {
    repository: Arc<dyn RoomRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
}

impl RoomService {
    pub fn new(repository: Arc<dyn RoomRepository + Send + Sync>) -> Self {
        Self::with_generators(
            repository,
            Arc::new(SystemClock::new()),
            Arc::new(UuidIdGenerator::new()),
        )
    }

    pub fn with_generators(
        repository: Arc<dyn RoomRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            clock,
            id_generator,
        }
    }

    /// Returns the active room for `(slug, team_id)`, inserting `new_room` if
    /// there is none. On a hit every other input field is ignored.
    ///
    /// A caller that loses an insert race gets `Conflict` from the store and
    /// falls back to reading the winner's row.
    #[instrument(skip(self, new_room), fields(slug = %new_room.slug, team_id = %new_room.team_id))]
    pub async fn find_or_create_room(&self, new_room: NewRoom) -> Result<Room, AppError> {
        if let Some(room) = self
            .repository
            .find_active_room(&new_room.slug, &new_room.team_id)
            .await?
        {
            debug!(room_id = %room.id, "Existing room found");
            return Ok(room);
        }

        let slug = new_room.slug.clone();
        let team_id = new_room.team_id.clone();
        let id = new_room
            .id
            .clone()
            .unwrap_or_else(|| self.id_generator.generate());
        let room = Room::create(new_room, id, self.clock.now());

        match self.repository.insert_room(&room).await {
            Ok(created) => {
                info!(room_id = %created.id, "Room created successfully");
                Ok(created)
            }
            Err(AppError::Conflict(reason)) => {
                warn!(reason = %reason, "Room insert conflicted, retrying lookup");
                match self.repository.find_active_room(&slug, &team_id).await? {
                    Some(existing) => {
                        debug!(room_id = %existing.id, "Concurrently created room found");
                        Ok(existing)
                    }
                    None => Err(AppError::Conflict(reason)),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the active room matching both keys
    #[instrument(skip(self))]
    pub async fn find_room(&self, slug: &str, team_id: &str) -> Result<Room, AppError> {
        self.repository
            .find_active_room(slug, team_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room {slug} in team {team_id}")))
    }

    /// Lists a team's active rooms, oldest first
    #[instrument(skip(self))]
    pub async fn find_rooms(&self, team_id: &str) -> Result<Vec<Room>, AppError> {
        let rooms = self.repository.find_active_rooms(team_id).await?;
        debug!(room_count = rooms.len(), "Team rooms retrieved");
        Ok(rooms)
    }

    /// Resolves a room by id whether or not it has been deleted
    #[instrument(skip(self))]
    pub async fn find_room_by_id(&self, room_id: &str) -> Result<Room, AppError> {
        self.repository
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))
    }

    #[instrument(skip(self, changes))]
    pub async fn update_room(
        &self,
        slug: &str,
        team_id: &str,
        changes: RoomChanges,
    ) -> Result<Room, AppError> {
        let room = self
            .repository
            .update_active_room(slug, team_id, &changes, self.clock.now())
            .await?;

        info!(room_id = %room.id, new_slug = %room.slug, "Room updated successfully");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn delete_room(&self, slug: &str, team_id: &str) -> Result<(), AppError> {
        let room = self
            .repository
            .soft_delete_room(slug, team_id, self.clock.now())
            .await?;

        info!(room_id = %room.id, "Room deleted successfully");
        Ok(())
    }

    /// User ids subscribed to the room
    #[instrument(skip(self))]
    pub async fn subscribers(&self, room_id: &str) -> Result<Vec<String>, AppError> {
        let subscribers = self.repository.subscribers(room_id).await?;
        debug!(subscriber_count = subscribers.len(), "Subscribers retrieved");
        Ok(subscribers)
    }
}
