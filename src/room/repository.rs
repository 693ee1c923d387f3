use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use super::models::{Room, RoomChanges, RoomMembership, RoomRow};
use crate::shared::AppError;

const ROOM_COLUMNS: &str = "id, created_at, updated_at, deleted_at, team_id, slug, topic";

/// Trait for room repository operations
///
/// Lookups by `(slug, team_id)` only ever see active rooms. Lookups by id see
/// every room, deleted or not.
#[async_trait]
pub trait RoomRepository {
    /// Inserts a new room, failing with `AppError::Conflict` when the id or the
    /// active `(slug, team_id)` pair is already taken
    async fn insert_room(&self, room: &Room) -> Result<Room, AppError>;
    async fn find_active_room(&self, slug: &str, team_id: &str)
        -> Result<Option<Room>, AppError>;
    async fn find_active_rooms(&self, team_id: &str) -> Result<Vec<Room>, AppError>;
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, AppError>;

    /// Atomically applies `changes` to the active room and stamps `updated_at`
    async fn update_active_room(
        &self,
        slug: &str,
        team_id: &str,
        changes: &RoomChanges,
        now: DateTime<Utc>,
    ) -> Result<Room, AppError>;

    /// Atomically soft-deletes the active room
    async fn soft_delete_room(
        &self,
        slug: &str,
        team_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Room, AppError>;

    /// User ids with a membership in the room; empty when there are none
    async fn subscribers(&self, room_id: &str) -> Result<Vec<String>, AppError>;
}

/// In-memory implementation of RoomRepository for development and testing
///
/// The mutex stands in for the database's unique index: every check-and-write
/// happens under a single lock.
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<String, Room>>,
    memberships: Mutex<Vec<RoomMembership>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            memberships: Mutex::new(Vec::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated memberships
    pub fn with_memberships(memberships: Vec<RoomMembership>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            memberships: Mutex::new(memberships),
        }
    }

    /// Returns the number of stored rows, deleted ones included
    pub fn room_count(&self) -> usize {
        self.rooms.lock().map(|rooms| rooms.len()).unwrap_or(0)
    }

    fn lock_rooms(&self) -> Result<MutexGuard<'_, HashMap<String, Room>>, AppError> {
        self.rooms
            .lock()
            .map_err(|_| AppError::StoreUnavailable("room store lock poisoned".to_string()))
    }

    fn active_id(rooms: &HashMap<String, Room>, slug: &str, team_id: &str) -> Option<String> {
        rooms
            .values()
            .find(|r| r.is_active() && r.slug == slug && r.team_id == team_id)
            .map(|r| r.id.clone())
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room))]
    async fn insert_room(&self, room: &Room) -> Result<Room, AppError> {
        debug!(room_id = %room.id, slug = %room.slug, team_id = %room.team_id, "Inserting room in memory");

        let mut rooms = self.lock_rooms()?;
        if rooms.contains_key(&room.id) {
            warn!(room_id = %room.id, "Room id already exists in memory");
            return Err(AppError::Conflict(format!("room id {} already exists", room.id)));
        }
        if room.is_active() && Self::active_id(&rooms, &room.slug, &room.team_id).is_some() {
            warn!(slug = %room.slug, team_id = %room.team_id, "Active room with slug already exists in memory");
            return Err(AppError::Conflict(format!(
                "room {} already exists in team {}",
                room.slug, room.team_id
            )));
        }
        rooms.insert(room.id.clone(), room.clone());

        debug!(room_id = %room.id, "Room inserted successfully in memory");
        Ok(room.clone())
    }

    #[instrument(skip(self))]
    async fn find_active_room(
        &self,
        slug: &str,
        team_id: &str,
    ) -> Result<Option<Room>, AppError> {
        debug!("Fetching active room from memory");

        let rooms = self.lock_rooms()?;
        let room = Self::active_id(&rooms, slug, team_id).and_then(|id| rooms.get(&id).cloned());

        match &room {
            Some(r) => debug!(room_id = %r.id, "Room found in memory"),
            None => debug!("Room not found in memory"),
        }

        Ok(room)
    }

    #[instrument(skip(self))]
    async fn find_active_rooms(&self, team_id: &str) -> Result<Vec<Room>, AppError> {
        debug!("Listing active team rooms in memory");

        let rooms = self.lock_rooms()?;
        let mut room_list: Vec<Room> = rooms
            .values()
            .filter(|r| r.is_active() && r.team_id == team_id)
            .cloned()
            .collect();
        room_list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        debug!(count = room_list.len(), "Rooms listed successfully in memory");
        Ok(room_list)
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, AppError> {
        debug!("Fetching room by id from memory");

        let rooms = self.lock_rooms()?;
        Ok(rooms.get(room_id).cloned())
    }

    #[instrument(skip(self, changes))]
    async fn update_active_room(
        &self,
        slug: &str,
        team_id: &str,
        changes: &RoomChanges,
        now: DateTime<Utc>,
    ) -> Result<Room, AppError> {
        debug!("Updating room in memory");

        let mut rooms = self.lock_rooms()?;
        let Some(room_id) = Self::active_id(&rooms, slug, team_id) else {
            warn!("Room not found for update in memory");
            return Err(AppError::NotFound(format!("room {slug} in team {team_id}")));
        };

        if let Some(new_slug) = changes.slug.as_deref().filter(|s| *s != slug) {
            if Self::active_id(&rooms, new_slug, team_id).is_some() {
                warn!(new_slug = %new_slug, "Slug already taken in memory");
                return Err(AppError::Conflict(format!(
                    "room {new_slug} already exists in team {team_id}"
                )));
            }
        }

        let room = rooms
            .get_mut(&room_id)
            .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))?;
        room.apply(changes, now);

        debug!(room_id = %room.id, "Room updated successfully in memory");
        Ok(room.clone())
    }

    #[instrument(skip(self))]
    async fn soft_delete_room(
        &self,
        slug: &str,
        team_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Room, AppError> {
        debug!("Soft-deleting room in memory");

        let mut rooms = self.lock_rooms()?;
        let Some(room_id) = Self::active_id(&rooms, slug, team_id) else {
            warn!("Room not found for deletion in memory");
            return Err(AppError::NotFound(format!("room {slug} in team {team_id}")));
        };

        let room = rooms
            .get_mut(&room_id)
            .ok_or_else(|| AppError::NotFound(format!("room {room_id}")))?;
        room.mark_deleted(now);

        debug!(room_id = %room.id, "Room soft-deleted successfully in memory");
        Ok(room.clone())
    }

    #[instrument(skip(self))]
    async fn subscribers(&self, room_id: &str) -> Result<Vec<String>, AppError> {
        let memberships = self
            .memberships
            .lock()
            .map_err(|_| AppError::StoreUnavailable("membership lock poisoned".to_string()))?;

        Ok(memberships
            .iter()
            .filter(|m| m.room_id == room_id)
            .map(|m| m.user_id.clone())
            .collect())
    }
}

/// PostgreSQL implementation of room repository
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self, room))]
    async fn insert_room(&self, room: &Room) -> Result<Room, AppError> {
        debug!(room_id = %room.id, slug = %room.slug, team_id = %room.team_id, "Inserting room in database");

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "INSERT INTO rooms ({ROOM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(&room.id)
        .bind(room.created_at)
        .bind(room.updated_at)
        .bind(room.state.deleted_at())
        .bind(&room.team_id)
        .bind(&room.slug)
        .bind(&room.topic)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room.id, "Failed to insert room in database");
            AppError::from(e)
        })?;

        debug!(room_id = %row.id, "Room inserted successfully in database");
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_active_room(
        &self,
        slug: &str,
        team_id: &str,
    ) -> Result<Option<Room>, AppError> {
        debug!("Fetching active room from database");

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE slug = $1 AND team_id = $2 AND deleted_at IS NULL"
        ))
        .bind(slug)
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch room from database");
            AppError::from(e)
        })?;

        match &row {
            Some(r) => debug!(room_id = %r.id, "Room found in database"),
            None => debug!("Room not found in database"),
        }

        Ok(row.map(Room::from))
    }

    #[instrument(skip(self))]
    async fn find_active_rooms(&self, team_id: &str) -> Result<Vec<Room>, AppError> {
        debug!("Listing active team rooms from database");

        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE team_id = $1 AND deleted_at IS NULL ORDER BY created_at, id"
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list rooms from database");
            AppError::from(e)
        })?;

        debug!(count = rows.len(), "Rooms listed successfully from database");
        Ok(rows.into_iter().map(Room::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, AppError> {
        debug!("Fetching room by id from database");

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"
        ))
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch room by id from database");
            AppError::from(e)
        })?;

        Ok(row.map(Room::from))
    }

    #[instrument(skip(self, changes))]
    async fn update_active_room(
        &self,
        slug: &str,
        team_id: &str,
        changes: &RoomChanges,
        now: DateTime<Utc>,
    ) -> Result<Room, AppError> {
        debug!("Updating room in database");

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "UPDATE rooms SET slug = COALESCE($3, slug), topic = COALESCE($4, topic), \
             updated_at = GREATEST($5, updated_at + interval '1 microsecond') \
             WHERE slug = $1 AND team_id = $2 AND deleted_at IS NULL RETURNING {ROOM_COLUMNS}"
        ))
        .bind(slug)
        .bind(team_id)
        .bind(changes.slug.as_deref())
        .bind(changes.topic.as_deref())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to update room in database");
            AppError::from(e)
        })?;

        match row {
            Some(row) => {
                debug!(room_id = %row.id, "Room updated successfully in database");
                Ok(row.into())
            }
            None => {
                warn!("Room not found for update");
                Err(AppError::NotFound(format!("room {slug} in team {team_id}")))
            }
        }
    }

    #[instrument(skip(self))]
    async fn soft_delete_room(
        &self,
        slug: &str,
        team_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Room, AppError> {
        debug!("Soft-deleting room in database");

        // Both assignments read the pre-update updated_at, so they stay equal
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "UPDATE rooms SET updated_at = GREATEST($3, updated_at + interval '1 microsecond'), \
             deleted_at = GREATEST($3, updated_at + interval '1 microsecond') \
             WHERE slug = $1 AND team_id = $2 AND deleted_at IS NULL RETURNING {ROOM_COLUMNS}"
        ))
        .bind(slug)
        .bind(team_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to delete room in database");
            AppError::from(e)
        })?;

        match row {
            Some(row) => {
                debug!(room_id = %row.id, "Room soft-deleted successfully in database");
                Ok(row.into())
            }
            None => {
                warn!("Room not found for deletion");
                Err(AppError::NotFound(format!("room {slug} in team {team_id}")))
            }
        }
    }

    #[instrument(skip(self))]
    async fn subscribers(&self, room_id: &str) -> Result<Vec<String>, AppError> {
        debug!("Fetching room subscribers from database");

        let user_ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM room_memberships WHERE room_id = $1 ORDER BY id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch subscribers from database");
            AppError::from(e)
        })?;

        debug!(count = user_ids.len(), "Subscribers fetched from database");
        Ok(user_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::models::{NewRoom, RoomState};
    use chrono::TimeZone;

    /// Test helper functions for creating test data
    mod helpers {
        use super::*;

        pub fn at(secs: i64) -> DateTime<Utc> {
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
        }

        /// Creates an active room with a specific id, team and slug
        pub fn create_test_room(room_id: &str, team_id: &str, slug: &str) -> Room {
            Room::create(
                NewRoom::new(team_id, slug).with_topic("topic1"),
                room_id.to_string(),
                at(0),
            )
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_insert_and_find_room() {
        let repo = InMemoryRoomRepository::new();
        let room = create_test_room("room-1", "team-1", "general");

        let inserted = repo.insert_room(&room).await.unwrap();
        assert_eq!(inserted, room);

        let found = repo.find_active_room("general", "team-1").await.unwrap();
        assert_eq!(found, Some(room));
    }

    #[tokio::test]
    async fn test_find_room_is_scoped_by_team() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();

        let found = repo.find_active_room("general", "team-2").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_slug_conflicts() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();

        let result = repo
            .insert_room(&create_test_room("room-2", "team-1", "general"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(repo.room_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_conflicts() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();

        let result = repo
            .insert_room(&create_test_room("room-1", "team-1", "random"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_slug_reusable_after_soft_delete() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();
        repo.soft_delete_room("general", "team-1", at(5)).await.unwrap();

        repo.insert_room(&create_test_room("room-2", "team-1", "general"))
            .await
            .unwrap();
        let found = repo.find_active_room("general", "team-1").await.unwrap().unwrap();
        assert_eq!(found.id, "room-2");
    }

    #[tokio::test]
    async fn test_soft_delete_sets_state_and_updated_at() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();

        let deleted = repo.soft_delete_room("general", "team-1", at(5)).await.unwrap();
        assert_eq!(deleted.state, RoomState::Deleted { deleted_at: at(5) });
        assert_eq!(deleted.updated_at, at(5));

        let stored = repo.get_room("room-1").await.unwrap().unwrap();
        assert_eq!(stored, deleted);
        assert!(repo.find_active_room("general", "team-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_twice_is_not_found() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();
        repo.soft_delete_room("general", "team-1", at(5)).await.unwrap();

        let result = repo.soft_delete_room("general", "team-1", at(6)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_room() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();

        let changes = RoomChanges::new().with_slug("lobby").with_topic("topic2");
        let updated = repo
            .update_active_room("general", "team-1", &changes, at(3))
            .await
            .unwrap();

        assert_eq!(updated.slug, "lobby");
        assert_eq!(updated.topic, "topic2");
        assert_eq!(updated.updated_at, at(3));
        assert_eq!(updated.created_at, at(0));
        assert!(repo.find_active_room("general", "team-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_into_taken_slug_conflicts() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();
        repo.insert_room(&create_test_room("room-2", "team-1", "random"))
            .await
            .unwrap();

        let changes = RoomChanges::new().with_slug("random");
        let result = repo
            .update_active_room("general", "team-1", &changes, at(3))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let untouched = repo.get_room("room-1").await.unwrap().unwrap();
        assert_eq!(untouched.slug, "general");
        assert_eq!(untouched.updated_at, at(0));
    }

    #[tokio::test]
    async fn test_update_nonexistent_room() {
        let repo = InMemoryRoomRepository::new();

        let result = repo
            .update_active_room("missing", "team-1", &RoomChanges::new(), at(1))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_active_rooms_filters_team_and_deleted() {
        let repo = InMemoryRoomRepository::new();
        repo.insert_room(&create_test_room("room-1", "team-1", "general"))
            .await
            .unwrap();
        repo.insert_room(&create_test_room("room-2", "team-1", "random"))
            .await
            .unwrap();
        repo.insert_room(&create_test_room("room-3", "team-1", "old"))
            .await
            .unwrap();
        repo.insert_room(&create_test_room("room-4", "team-2", "general"))
            .await
            .unwrap();
        repo.soft_delete_room("old", "team-1", at(1)).await.unwrap();

        let rooms = repo.find_active_rooms("team-1").await.unwrap();
        let ids: Vec<&str> = rooms.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["room-1", "room-2"]);
    }

    #[tokio::test]
    async fn test_list_rooms_empty() {
        let repo = InMemoryRoomRepository::new();

        let rooms = repo.find_active_rooms("team-1").await.unwrap();
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers() {
        let repo = InMemoryRoomRepository::with_memberships(vec![
            RoomMembership::new("room-1", "user-1"),
            RoomMembership::new("room-1", "user-2"),
            RoomMembership::new("room-2", "user-3"),
        ]);

        let subscribers = repo.subscribers("room-1").await.unwrap();
        assert_eq!(subscribers, vec!["user-1".to_string(), "user-2".to_string()]);

        let none = repo.subscribers("room-9").await.unwrap();
        assert!(none.is_empty());
    }
}
