//! Server Module
//!
//! Server-side setup: configuration, the shared application context and
//! application assembly.
//!
//! # Architecture
//!
//! - **`state`** - `AppState` and its in-memory constructor
//! - **`config`** - Configuration loading (TOML file, environment) and database connection
//! - **`init`** - Backend selection, router creation, job startup
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState
//! ├── config.rs       - ServerConfig and load_database
//! └── init.rs         - create_app
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::load`
//! 2. **Backend Selection**: PostgreSQL and Redis when reachable, memory otherwise
//! 3. **Router Creation**: All routes wired to one `AppState`
//! 4. **Jobs**: Composition, enqueue and consumer tasks
//!
//! # Example
//!
//! ```rust,no_run
//! use pulsechat::backend::server::{config::ServerConfig, init::create_app};
//!
//! # async fn example() {
//! let (app, jobs) = create_app(ServerConfig::default()).await;
//! # jobs.shutdown();
//! # }
//! ```

pub mod config;
pub mod init;
pub mod state;

pub use config::ServerConfig;
pub use init::create_app;
pub use state::AppState;
