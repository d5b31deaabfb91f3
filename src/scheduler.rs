//! Background jobs.
//!
//! Currently a single job: the monthly reset of every user's make-up
//! check-in quota. The task sleeps until the next UTC month boundary,
//! runs the reset, and goes back to sleep.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::db::Database;

/// First instant of the month after `now`, in UTC.
fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first of month is a valid UTC instant")
}

/// Spawn the monthly quota reset loop. Runs until the process exits.
pub fn spawn_monthly_reset(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_month_start(now);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!("Next reward-count reset at {}", next);
            tokio::time::sleep(wait).await;

            match db.reset_all_reward_counts() {
                Ok(rows) => {
                    tracing::info!("Monthly reward-count reset cleared {} accounts", rows)
                }
                Err(e) => tracing::error!("Monthly reward-count reset failed: {}", e),
            }
        }
    })
}
