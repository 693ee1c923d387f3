// Library crate for the chat room store
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod db;
pub mod reader;
pub mod room;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use reader::{ReaderConfig, UnreadRoomsClient};
pub use room::{NewRoom, Room, RoomChanges, RoomRepository, RoomService, RoomState};
pub use shared::{AppError, AppState};
