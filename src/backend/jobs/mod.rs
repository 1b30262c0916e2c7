//! Auto-Message Pipeline
//!
//! Scheduled messages move `composed → queued → sent`:
//!
//! - the composition job pairs active users once a day
//! - the enqueue job pushes due AutoMessages onto the work queue
//! - the consumer turns queued items into real messages
//!
//! # Module Structure
//!
//! ```text
//! jobs/
//! ├── composer.rs  - daily pairing and AutoMessage creation
//! ├── enqueue.rs   - due AutoMessages to the queue
//! ├── consumer.rs  - queue items to messages
//! └── schedule.rs  - task spawning and shutdown
//! ```

pub mod composer;
pub mod consumer;
pub mod enqueue;
pub mod schedule;

pub use composer::{compose_auto_messages, CompositionReport};
pub use consumer::{ConsumeOutcome, Consumer};
pub use enqueue::{enqueue_due, EnqueueReport};
pub use schedule::{next_daily_run, spawn_jobs, JobHandles};
