/**
 * Application State Management
 *
 * `AppState` is the application context: built once at startup and handed
 * to every handler, session and job. It holds the three collaborators
 * behind trait objects plus the in-process hub and token verifier.
 *
 * # Extraction
 *
 * Handlers take the whole state:
 *
 * ```rust,no_run
 * use pulsechat::backend::server::state::AppState;
 * use axum::extract::State;
 *
 * async fn handler(State(state): State<AppState>) {
 *     let online = state.presence.online_users().await;
 * }
 * ```
 */

use std::sync::Arc;

use crate::backend::auth::TokenVerifier;
use crate::backend::presence::{MemoryPresence, PresenceStore};
use crate::backend::queue::{MemoryQueue, WorkQueue};
use crate::backend::realtime::Hub;
use crate::backend::server::config::ServerConfig;
use crate::backend::store::{DocumentStore, MemoryStore};

/// Shared application context
#[derive(Clone)]
pub struct AppState {
    /// Users, conversations, messages, auto-messages
    pub store: Arc<dyn DocumentStore>,
    /// Online set, socket map, room membership, typing markers
    pub presence: Arc<dyn PresenceStore>,
    /// Durable queue between the enqueue job and the consumer
    pub queue: Arc<dyn WorkQueue>,
    /// Fan-out to live connections
    pub hub: Arc<Hub>,
    pub tokens: Arc<TokenVerifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        presence: Arc<dyn PresenceStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            store,
            presence,
            queue,
            hub: Arc::new(Hub::new(config.connection_capacity)),
            tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
            config: Arc::new(config),
        }
    }

    /// State backed entirely by in-memory collaborators
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryPresence::new()),
            Arc::new(MemoryQueue::new()),
        )
    }
}
