//! In-memory server fixtures
//!
//! `TestServer` wraps an `AppState` built from the in-memory collaborators.
//! `TestClient` is a connected session whose outbound queue the test reads
//! directly instead of going through a socket.

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use pulsechat::backend::auth::SessionIdentity;
use pulsechat::backend::server::config::ServerConfig;
use pulsechat::backend::server::state::AppState;
use pulsechat::backend::session::{LiveSession, SessionContext, SessionManager};
use pulsechat::shared::messaging::{UserRecord, UserRole};
use pulsechat::shared::RealtimeEvent;

pub struct TestServer {
    pub state: AppState,
    pub manager: SessionManager,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let state = AppState::in_memory(config);
        let manager = SessionManager::new(state.clone());
        Self { state, manager }
    }

    /// Insert an active user
    pub async fn user(&self, username: &str) -> UserRecord {
        let user = UserRecord::new(username);
        self.state
            .store
            .upsert_user(user.clone())
            .await
            .expect("failed to insert user");
        user
    }

    pub fn token_for(&self, user: &UserRecord) -> String {
        self.state
            .tokens
            .create_token(user.id, &user.username, UserRole::Regular)
            .expect("failed to create token")
    }

    /// Authenticate with a real token and bring the session online
    pub async fn connect(&self, user: &UserRecord) -> TestClient {
        let token = self.token_for(user);
        let identity: SessionIdentity = self
            .manager
            .authenticate(&token)
            .expect("token should verify");
        let (session, rx) = self.manager.on_connect(identity).await;
        TestClient {
            user_id: user.id,
            session: Some(session),
            rx,
        }
    }

    pub async fn disconnect(&self, client: &mut TestClient) {
        if let Some(session) = client.session.take() {
            self.manager.on_disconnect(session).await;
        }
    }

    /// Dispatch a frame on behalf of a client
    pub async fn send(&self, client: &TestClient, frame: Value) {
        self.manager.dispatch(client.context(), &frame.to_string()).await;
    }
}

pub struct TestClient {
    pub user_id: Uuid,
    pub session: Option<LiveSession>,
    pub rx: mpsc::Receiver<RealtimeEvent>,
}

impl TestClient {
    pub fn context(&self) -> &SessionContext {
        self.session
            .as_ref()
            .map(|session| session.context())
            .expect("client is disconnected")
    }

    pub fn connection_id(&self) -> Uuid {
        self.context().connection_id
    }

    /// Everything queued for this connection so far
    pub fn drain(&mut self) -> Vec<RealtimeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// The response of the ack with `id`, draining the queue
    pub fn ack(&mut self, id: u64) -> Value {
        self.drain()
            .into_iter()
            .find_map(|event| match event {
                RealtimeEvent::Ack { id: ack_id, response } if ack_id == id => Some(response),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no ack {} received", id))
    }
}
