//! Periodic diagnostic task reporting the total user count.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::users::repo::UserRepository;

/// Runs until `shutdown` flips to true. Each tick reads the user list and
/// logs the count; a failed read is logged and the loop carries on, with no
/// backoff. An in-flight repository call is allowed to finish before the
/// loop exits, so cancellation is observed within one tick interval.
pub async fn run(
    repo: Arc<dyn UserRepository>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval fires immediately; consume that so the first report lands one
    // full period after startup
    ticker.tick().await;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("user census shutting down");
                    return;
                }
            }
            _ = ticker.tick() => {
                match repo.list_all().await {
                    Ok(users) => info!(total_users = users.len(), "user census"),
                    Err(e) => error!(error = %e, "user census fetch failed"),
                }
                if *shutdown.borrow() {
                    info!("user census shutting down");
                    return;
                }
            }
        }
    }
}
