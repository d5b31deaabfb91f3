use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Rolling window selector for the analytics endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
}

/// An inclusive UTC time window.
///
/// All stored timestamps are UTC and all window math happens in UTC; there
/// is deliberately no local-time path anywhere in the aggregation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StatsWindow {
    pub fn for_timeframe(timeframe: Timeframe, now: DateTime<Utc>) -> Self {
        match timeframe {
            Timeframe::Week => Self::week_of(now),
            Timeframe::Month => Self::month_of(now),
        }
    }

    /// Monday 00:00:00 through Sunday 23:59:59.999 of the ISO week
    /// containing `now`.
    pub fn week_of(now: DateTime<Utc>) -> Self {
        let monday = now.date_naive()
            - Duration::days(now.date_naive().weekday().num_days_from_monday() as i64);
        Self::spanning_days(monday, monday + Duration::days(6))
    }

    /// First through last calendar day of the month containing `now`.
    pub fn month_of(now: DateTime<Utc>) -> Self {
        let first = now
            .date_naive()
            .with_day(1)
            .expect("day 1 exists in every month");
        let next_month = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .expect("first of month is always valid");
        Self::spanning_days(first, next_month - Duration::days(1))
    }

    /// The week window `weeks_back` whole weeks before the current one.
    /// `weeks_back == 0` is the current week.
    pub fn week_before(now: DateTime<Utc>, weeks_back: i64) -> Self {
        Self::week_of(now - Duration::weeks(weeks_back))
    }

    /// One full calendar day as a window.
    pub fn day(date: NaiveDate) -> Self {
        Self::spanning_days(date, date)
    }

    fn spanning_days(first: NaiveDate, last: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(
            &first
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid"),
        );
        let end = Utc.from_utc_datetime(
            &last
                .and_hms_milli_opt(23, 59, 59, 999)
                .expect("end of day is always valid"),
        );
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Days from the window start through `now`, inclusive, so mid-window
    /// averages divide by days *so far* rather than the full window length.
    /// Never less than 1.
    pub fn days_elapsed(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = now - self.start;
        let days = (elapsed.num_milliseconds() as f64 / 86_400_000.0).ceil() as i64;
        days.max(1)
    }

    /// Calendar days covered by the window, in order.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut d = self.start.date_naive();
        let last = self.end.date_naive();
        while d <= last {
            days.push(d);
            d += Duration::days(1);
        }
        days
    }
}
