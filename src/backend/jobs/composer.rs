//! Daily auto-message composition
//!
//! Active users are shuffled and paired off; each pair gets one
//! AutoMessage from a fixed set of templates, due today at a random hour
//! between 08:00 and 10:00 UTC. With an odd number of users the last one
//! sits out.

use std::ops::Range;

use chrono::{DateTime, NaiveTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::store::DocumentStore;
use crate::shared::messaging::AutoMessage;

pub const TEMPLATES: [&str; 4] = [
    "Hope you're having a great day!",
    "Let's catch up soon!",
    "Random act of messaging!",
    "How's everything going?",
];

/// UTC hours a composed message may be delivered at
pub const DELIVERY_HOURS: Range<u32> = 8..11;

/// Outcome of one composition run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositionReport {
    pub active_users: usize,
    pub composed: usize,
}

/// Shuffle and pair consecutive users, dropping an odd one out
pub fn pair_users<R: Rng + ?Sized>(mut users: Vec<Uuid>, rng: &mut R) -> Vec<(Uuid, Uuid)> {
    users.shuffle(rng);
    users
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Today (relative to `now`) at a random delivery hour, on the hour
pub fn delivery_time<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
    let hour = rng.gen_range(DELIVERY_HOURS);
    NaiveTime::from_hms_opt(hour, 0, 0)
        .map(|time| now.date_naive().and_time(time).and_utc())
        .unwrap_or(now)
}

pub fn pick_template<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    TEMPLATES.choose(rng).copied().unwrap_or(TEMPLATES[0])
}

/// Plan the AutoMessages for a set of active users without touching storage
pub fn plan_auto_messages<R: Rng + ?Sized>(
    users: Vec<Uuid>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<AutoMessage> {
    if users.len() < 2 {
        return Vec::new();
    }
    pair_users(users, rng)
        .into_iter()
        .map(|(sender, receiver)| {
            let content = pick_template(rng).to_string();
            AutoMessage::new(sender, receiver, content, delivery_time(now, rng))
        })
        .collect()
}

/// Run the composition job once
pub async fn compose_auto_messages<R: Rng + Send>(
    store: &dyn DocumentStore,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<CompositionReport, BackendError> {
    let users: Vec<Uuid> = store
        .find_active_users()
        .await?
        .into_iter()
        .map(|user| user.id)
        .collect();
    let active_users = users.len();

    if active_users < 2 {
        tracing::info!("[Jobs] Not enough active users to compose messages ({})", active_users);
        return Ok(CompositionReport {
            active_users,
            composed: 0,
        });
    }

    let planned = plan_auto_messages(users, rng, now);
    let mut composed = 0;
    for auto_message in planned {
        store.create_auto_message(auto_message).await?;
        composed += 1;
    }

    tracing::info!("[Jobs] Composed {} auto-messages for {} active users", composed, active_users);
    Ok(CompositionReport {
        active_users,
        composed,
    })
}
