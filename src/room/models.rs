use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Whether a room is live or has been soft-deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoomState {
    Active,
    Deleted { deleted_at: DateTime<Utc> },
}

impl RoomState {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(deleted_at) => RoomState::Deleted { deleted_at },
            None => RoomState::Active,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RoomState::Active => None,
            RoomState::Deleted { deleted_at } => Some(*deleted_at),
        }
    }
}

/// A team-scoped chat room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: RoomState,
    pub team_id: String,
    pub slug: String,
    pub topic: String,
}

impl Room {
    /// Builds the row that find-or-create inserts on a miss
    pub fn create(new_room: NewRoom, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            state: RoomState::Active,
            team_id: new_room.team_id,
            slug: new_room.slug,
            topic: new_room.topic,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == RoomState::Active
    }

    /// Refreshes updated_at so it strictly increases, even when the clock
    /// stalls or steps backwards
    pub fn touch(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.updated_at = now.max(self.updated_at + Duration::microseconds(1));
        self.updated_at
    }

    /// Applies the mutable fields and stamps the mutation
    pub fn apply(&mut self, changes: &RoomChanges, now: DateTime<Utc>) {
        if let Some(slug) = &changes.slug {
            self.slug = slug.clone();
        }
        if let Some(topic) = &changes.topic {
            self.topic = topic.clone();
        }
        self.touch(now);
    }

    /// Soft-deletes the room: deleted_at and updated_at get the same instant
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        let deleted_at = self.touch(now);
        self.state = RoomState::Deleted { deleted_at };
    }
}

/// Database row for the rooms table
#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub team_id: String,
    pub slug: String,
    pub topic: String,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            state: RoomState::from_deleted_at(row.deleted_at),
            team_id: row.team_id,
            slug: row.slug,
            topic: row.topic,
        }
    }
}

/// Input for find-or-create. Without an id the store assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRoom {
    pub id: Option<String>,
    pub team_id: String,
    pub slug: String,
    pub topic: String,
}

impl NewRoom {
    pub fn new(team_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: None,
            team_id: team_id.into(),
            slug: slug.into(),
            topic: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }
}

/// Mutable room fields; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomChanges {
    pub slug: Option<String>,
    pub topic: Option<String>,
}

impl RoomChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Database model for the room_memberships table (read-only here)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
}

impl RoomMembership {
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.into(),
            user_id: user_id.into(),
        }
    }
}
