//! Clock and accounting week.

use std::{fmt, sync::Mutex};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of "now" for week boundaries and timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The accounting week: Sunday 00:00:00 up to, not including, the next
/// Sunday 00:00:00 in the fleet's timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekWindow {
    pub week_starting: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts one hour later.
        None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map_or_else(|| Utc.from_utc_datetime(&naive), |l| l.with_timezone(&Utc)),
    }
}

impl WeekWindow {
    /// The week that contains `now`.
    pub fn containing(now: DateTime<Utc>, tz: Tz) -> Self {
        let local = now.with_timezone(&tz);
        let back = i64::from(local.weekday().num_days_from_sunday());
        let week_starting = local.date_naive() - Duration::days(back);
        Self::starting(week_starting, tz)
    }

    /// The week opened by `week_starting`, which should be a Sunday.
    pub fn starting(week_starting: NaiveDate, tz: Tz) -> Self {
        Self {
            week_starting,
            start: local_midnight(tz, week_starting),
            end: local_midnight(tz, week_starting + Duration::days(7)),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    #[test]
    fn week_opens_on_sunday_midnight() {
        // Monday.
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
        let week = WeekWindow::containing(now, Tz::UTC);

        assert_eq!(week.week_starting, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(week.week_starting.weekday(), Weekday::Sun);
        assert_eq!(week.start, Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
        assert_eq!(week.end, Utc.with_ymd_and_hms(2026, 10, 25, 0, 0, 0).unwrap());
    }

    #[test]
    fn saturday_last_second_is_inside_sunday_is_not() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        let week = WeekWindow::containing(now, Tz::UTC);

        assert!(week.contains(now));
        assert!(week.contains(Utc.with_ymd_and_hms(2026, 10, 24, 23, 59, 59).unwrap()));
        assert!(!week.contains(Utc.with_ymd_and_hms(2026, 10, 25, 0, 0, 0).unwrap()));
        assert!(!week.contains(Utc.with_ymd_and_hms(2026, 10, 17, 23, 59, 59).unwrap()));
    }

    #[test]
    fn week_follows_fleet_timezone() {
        // Sunday 03:00 UTC is still Saturday evening in Chicago.
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap();
        let week = WeekWindow::containing(now, chrono_tz::America::Chicago);

        assert_eq!(week.week_starting, NaiveDate::from_ymd_opt(2026, 10, 11).unwrap());
        assert_eq!(week.start, Utc.with_ymd_and_hms(2026, 10, 11, 5, 0, 0).unwrap());
        assert!(week.contains(now));
    }

    #[test]
    fn fixed_clock_moves_on_demand() {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(Duration::days(2));
        assert_eq!(clock.now(), start + Duration::days(2));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
