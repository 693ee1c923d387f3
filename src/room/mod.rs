// Public API - what other modules can use
pub use models::{NewRoom, Room, RoomChanges, RoomMembership, RoomState};
pub use repository::{InMemoryRoomRepository, PostgresRoomRepository, RoomRepository};
pub use service::RoomService;

// Internal modules
pub mod generators;
pub mod models;
pub mod repository;
pub mod service;
