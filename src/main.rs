use std::sync::Arc;

use chatrooms::{
    db,
    room::{PostgresRoomRepository, RoomService},
    AppConfig, AppError, AppState, UnreadRoomsClient,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatrooms=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chat room store");

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;

    let room_service = Arc::new(RoomService::new(Arc::new(PostgresRoomRepository::new(pool))));
    let unread_rooms = Arc::new(UnreadRoomsClient::new(config.reader)?);
    let app_state = AppState::new(room_service, unread_rooms);

    // Optional arguments: a team id to count active rooms for, then a user id
    // to fetch unread rooms for
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(team_id) = args.first() {
        let rooms = app_state.room_service.find_rooms(team_id).await?;
        info!(team_id = %team_id, room_count = rooms.len(), "Active rooms");
    }
    if let Some(user_id) = args.get(1) {
        let unread = app_state.unread_rooms.unread_rooms(user_id).await?;
        info!(user_id = %user_id, unread = %unread, "Unread rooms");
    }

    info!("Room store ready");
    Ok(())
}
