use std::sync::Arc;

use crate::db::DbPool;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
///
/// The connection registry is constructed once here at server start and torn
/// down with the process — it is never a global.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Live WebSocket connection per user
    pub connections: Arc<ConnectionRegistry>,
}
