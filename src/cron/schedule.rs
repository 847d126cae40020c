use chrono::{
    DateTime, Duration as ChronoDuration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone,
};
use chrono_tz::Tz;
use std::time::Duration;

// DST gaps are whole quarter hours in every tz database zone.
const GAP_PROBE_MINUTES: i64 = 15;
const GAP_PROBE_LIMIT: usize = 4 * 24;

/// Daily wall-clock run time (hour and minute, seconds pinned to zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTime {
    time: NaiveTime,
}

impl RunTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    pub fn midnight() -> Self {
        Self {
            time: NaiveTime::default(),
        }
    }

    pub fn time(self) -> NaiveTime {
        self.time
    }
}

impl Default for RunTime {
    fn default() -> Self {
        Self::midnight()
    }
}

/// Next instant at `at` strictly after `now`, in `now`'s timezone.
///
/// "Tomorrow" is the next calendar day in that zone, so the gap across a DST
/// change is 23 or 25 hours rather than a flat 86400 seconds. A run time that
/// falls into a DST gap moves forward to the first valid local time; an
/// ambiguous one picks the earlier instant.
pub fn next_run(now: DateTime<Tz>, at: RunTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = local_instant(&tz, today, at);
    if now < candidate {
        return candidate;
    }

    match today.succ_opt() {
        Some(tomorrow) => local_instant(&tz, tomorrow, at),
        None => candidate + ChronoDuration::days(1),
    }
}

fn local_instant(tz: &Tz, date: NaiveDate, at: RunTime) -> DateTime<Tz> {
    let wall_clock = date.and_time(at.time());
    let mut naive = wall_clock;
    for _ in 0..GAP_PROBE_LIMIT {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(instant) => return instant,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => naive += ChronoDuration::minutes(GAP_PROBE_MINUTES),
        }
    }
    // A whole day without a valid local time: run at the wall-clock time
    // interpreted with the zone's UTC offset at that moment.
    let offset = tz.offset_from_utc_datetime(&wall_clock).fix();
    tz.from_utc_datetime(&(wall_clock - offset))
}

/// Time left until `next`, rounded up to whole seconds. Never negative.
///
/// Rounding up keeps a wake-up from landing just before the target, which
/// would otherwise schedule a second run at the same instant.
pub fn sleep_duration(now: DateTime<Tz>, next: DateTime<Tz>) -> Duration {
    match (next - now).to_std() {
        Ok(delta) => {
            Duration::from_secs(delta.as_secs() + u64::from(delta.subsec_nanos() > 0))
        }
        Err(_) => Duration::ZERO,
    }
}
