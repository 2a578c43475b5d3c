use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local, LocalResult, TimeZone};
use tokio::sync::watch;

use super::key::AddressKey;
use super::cryptopan::CryptoPanEngine;

/// Schedules the daily key swap: wakes once at the next occurrence of local wall-clock
/// hour `hour`, rotates, then reschedules for the following day. If the process starts
/// after `hour` has already passed today, the first rotation is scheduled for tomorrow —
/// "schedule next occurrence, fire once", never an immediate catch-up rotation on start.
pub struct KeyRotator;

impl KeyRotator {
    pub async fn run(engine: Arc<CryptoPanEngine>, hour: u32, mut shutdown: watch::Receiver<bool>) {
        loop {
            let sleep_for = duration_until_next(hour, Local::now());
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {
                    engine.rotate(AddressKey::create_random()).await;
                    tracing::info!("address key rotated");
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        tracing::debug!("key rotator shutting down");
                        return;
                    }
                }
            }
        }
    }
}

fn resolve_local(naive: chrono::NaiveDateTime) -> DateTime<Local> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _latest) => earliest,
        LocalResult::None => {
            // DST gap: the wall-clock hour doesn't exist today. Step forward an hour at
            // a time until we land on a representable instant.
            let mut candidate = naive + chrono::Duration::hours(1);
            loop {
                if let LocalResult::Single(dt) = Local.from_local_datetime(&candidate) {
                    return dt;
                }
                candidate += chrono::Duration::hours(1);
            }
        }
    }
}

fn duration_until_next(hour: u32, now: DateTime<Local>) -> StdDuration {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("hour is validated to be in 0..24 at config load time");
    let mut target = resolve_local(today);
    if target <= now {
        target = resolve_local(today + chrono::Duration::days(1));
    }
    (target - now).to_std().unwrap_or(StdDuration::from_secs(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn schedules_later_today_when_hour_not_yet_passed() {
        let now = Local::now().with_hour(1).unwrap().with_minute(0).unwrap().with_second(0).unwrap();
        let dur = duration_until_next(23, now);
        assert!(dur <= StdDuration::from_secs(22 * 3600 + 60));
        assert!(dur > StdDuration::from_secs(21 * 3600));
    }

    #[test]
    fn schedules_tomorrow_when_hour_already_passed() {
        let now = Local::now().with_hour(23).unwrap().with_minute(0).unwrap().with_second(0).unwrap();
        let dur = duration_until_next(1, now);
        assert!(dur <= StdDuration::from_secs(2 * 3600 + 60));
    }
}
