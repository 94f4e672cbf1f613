//! Background poll loop
//!
//! Refreshes every declared port on a fixed cadence. Bus errors are never
//! fatal here: affected ports are marked stale and the next cycle retries
//! (the fixed interval is the retry policy). Callers that care about
//! prolonged failure watch reading age; the loop has no caller-visible
//! return path.

use super::SessionShared;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Log the first consecutive failure, then every Nth
const FAILURE_LOG_EVERY: u32 = 25;

pub(crate) fn spawn_poll_thread(shared: Arc<SessionShared>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("setu-poll".to_string())
        .spawn(move || {
            log::info!("PollLoop: started ({:?} cadence)", shared.poll_interval);

            loop {
                let cycle_start = Instant::now();

                if shared.shutdown.load(Ordering::Relaxed) {
                    break;
                }

                if shared.polling_enabled.load(Ordering::Relaxed) {
                    // A held gate skips the whole cycle; the permit keeps
                    // acquire() out until an in-flight refresh lands
                    if let Some(_permit) = shared.gate.begin_poll() {
                        match shared.refresh_and_publish() {
                            Ok(()) => {
                                let streak = shared
                                    .counters
                                    .consecutive_failures
                                    .swap(0, Ordering::Relaxed);
                                if streak > 0 {
                                    log::info!(
                                        "PollLoop: bus recovered after {} failed refreshes",
                                        streak
                                    );
                                }
                            }
                            Err(e) => {
                                shared
                                    .counters
                                    .refresh_failures
                                    .fetch_add(1, Ordering::Relaxed);
                                let streak = shared
                                    .counters
                                    .consecutive_failures
                                    .fetch_add(1, Ordering::Relaxed)
                                    + 1;
                                if streak == 1 || streak % FAILURE_LOG_EVERY == 0 {
                                    log::warn!(
                                        "PollLoop: refresh failed ({} consecutive): {}",
                                        streak,
                                        e
                                    );
                                }
                            }
                        }
                    }
                }

                shared.counters.cycles.fetch_add(1, Ordering::Relaxed);

                // Maintain the cadence
                let elapsed = cycle_start.elapsed();
                if elapsed < shared.poll_interval {
                    thread::sleep(shared.poll_interval - elapsed);
                } else if elapsed > shared.poll_interval * 2 {
                    log::warn!(
                        "PollLoop: cycle overrun: {:?} (target {:?})",
                        elapsed,
                        shared.poll_interval
                    );
                }
            }

            log::info!("PollLoop: stopped");
        })?;

    Ok(handle)
}
