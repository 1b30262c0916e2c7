//! Background job scheduling
//!
//! Three long-lived tasks are spawned at startup: the daily composition
//! job, the periodic enqueue job and the queue consumer. `JobHandles`
//! aborts all of them on shutdown.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::jobs::{compose_auto_messages, enqueue_due, Consumer};
use crate::backend::server::state::AppState;

/// Next occurrence of `hour:00` UTC strictly after `now`
pub fn next_daily_run(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let Some(at) = NaiveTime::from_hms_opt(hour, 0, 0) else {
        return now + ChronoDuration::days(1);
    };
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Handles of the spawned background jobs
pub struct JobHandles {
    handles: Vec<JoinHandle<()>>,
}

impl JobHandles {
    /// Number of spawned job tasks
    pub fn count(&self) -> usize {
        self.handles.len()
    }

    /// Abort every job task
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        tracing::info!("[Jobs] Stopped {} background jobs", self.handles.len());
    }
}

/// Spawn composition, enqueue and consumer tasks
pub fn spawn_jobs(state: &AppState) -> JobHandles {
    let handles = vec![
        spawn_composition(state.clone()),
        spawn_enqueue(state.clone()),
        tokio::spawn(Consumer::new(state.clone()).run()),
    ];
    tracing::info!("[Jobs] Background jobs started");
    JobHandles { handles }
}

fn spawn_composition(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let hour = state.config.composition_hour;
        let mut rng = StdRng::from_entropy();
        loop {
            let now = Utc::now();
            let next = next_daily_run(now, hour);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!("[Jobs] Next composition run at {}", next);
            tokio::time::sleep(wait).await;

            if let Err(err) = compose_auto_messages(state.store.as_ref(), &mut rng, Utc::now()).await {
                tracing::error!("[Jobs] Composition job failed: {}", err);
            }
        }
    })
}

fn spawn_enqueue(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.enqueue_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match enqueue_due(state.store.as_ref(), state.queue.as_ref(), Utc::now()).await {
                Ok(report) if report.due > 0 => {
                    tracing::debug!(
                        "[Jobs] Enqueue tick: {} due, {} queued, {} skipped",
                        report.due,
                        report.queued,
                        report.skipped
                    );
                }
                Ok(_) => {}
                Err(err) => tracing::error!("[Jobs] Enqueue job failed: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::server::config::ServerConfig;
    use chrono::TimeZone;

    #[test]
    fn test_next_daily_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 1, 15, 0).unwrap();
        assert_eq!(
            next_daily_run(now, 2),
            Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_daily_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, 2),
            Utc.with_ymd_and_hms(2024, 3, 2, 2, 0, 0).unwrap()
        );
        let late = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            next_daily_run(late, 2),
            Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_shutdown_aborts_jobs() {
        let state = AppState::in_memory(ServerConfig::default());
        let jobs = spawn_jobs(&state);
        assert_eq!(jobs.count(), 3);
        jobs.shutdown();
    }
}
