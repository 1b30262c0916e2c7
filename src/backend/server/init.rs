/**
 * Server Initialization
 *
 * Builds the application context and router, and starts the background
 * jobs.
 *
 * # Initialization Process
 *
 * 1. Load PostgreSQL if `DATABASE_URL` is set (store and queue)
 * 2. Connect Redis if `REDIS_URL` is set (presence)
 * 3. Fall back to the in-memory backends for anything unavailable
 * 4. Create the router and spawn the jobs
 *
 * A missing or unreachable backend is logged and never prevents startup.
 */

use axum::Router;
use std::sync::Arc;

use crate::backend::jobs::{spawn_jobs, JobHandles};
use crate::backend::presence::{MemoryPresence, PresenceStore, RedisPresence};
use crate::backend::queue::{MemoryQueue, PgQueue, WorkQueue};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::store::{DocumentStore, MemoryStore, PgStore};

/// Pick the presence backend
async fn load_presence(redis_url: Option<&str>) -> Arc<dyn PresenceStore> {
    if let Some(url) = redis_url {
        match RedisPresence::connect(url).await {
            Ok(presence) => {
                tracing::info!("[Server] Presence backed by Redis");
                return Arc::new(presence);
            }
            Err(e) => {
                tracing::error!("[Server] Failed to connect to Redis: {}", e);
                tracing::warn!("[Server] Falling back to in-memory presence");
            }
        }
    }
    Arc::new(MemoryPresence::new())
}

/// Build the application state from configuration
///
/// # Returns
///
/// `AppState` with PostgreSQL/Redis collaborators where reachable and
/// in-memory ones otherwise
pub async fn build_state(config: ServerConfig) -> AppState {
    let pool = match config.database_url.as_deref() {
        Some(url) => load_database(url).await,
        None => None,
    };

    let (store, queue): (Arc<dyn DocumentStore>, Arc<dyn WorkQueue>) = match pool {
        Some(pool) => {
            tracing::info!("[Server] Store and queue backed by PostgreSQL");
            (
                Arc::new(PgStore::new(pool.clone())),
                Arc::new(PgQueue::new(pool, config.queue_name.clone())),
            )
        }
        None => {
            tracing::warn!("[Server] No database; store and queue are in-memory");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryQueue::new()))
        }
    };

    let presence = load_presence(config.redis_url.as_deref()).await;

    AppState::new(config, store, presence, queue)
}

/// Create and configure the Axum application
///
/// # Returns
///
/// The router and the handles of the background jobs, which the caller
/// shuts down on exit
pub async fn create_app(config: ServerConfig) -> (Router<()>, JobHandles) {
    tracing::info!("[Server] Initializing pulsechat server");

    let app_state = build_state(config).await;
    let jobs = spawn_jobs(&app_state);
    let app = create_router(app_state);

    tracing::info!("[Server] Router configured");
    (app, jobs)
}
