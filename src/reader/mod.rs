// Public API - what other modules can use
pub use client::{basic_auth_header, UnreadRoomsClient};
pub use config::ReaderConfig;

// Internal modules
mod client;
mod config;
