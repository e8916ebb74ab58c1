//! Cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds, UTC)
//! Field syntax: `*`, `*/N`, `N`, `a-b`, `a-b/N`, and comma lists of those.
//! Day of week is 0-6 from Sunday; 7 is accepted as Sunday too.
//! Example: "0 8 * * 1-5" = weekdays at 8:00

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use courier_core::error::{CourierError, Result};

/// Give up looking for a match this many years ahead ("0 0 30 2 *" never fires).
const SEARCH_YEARS: i32 = 5;

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minutes: Vec<bool>,
    hours: Vec<bool>,
    days_of_month: Vec<bool>,
    months: Vec<bool>,
    days_of_week: Vec<bool>,
    dom_any: bool,
    dow_any: bool,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CourierError::cron(format!(
                "'{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        }

        let mut days_of_week = parse_field(parts[4], 0, 7)?;
        // 7 is an alias for Sunday.
        if days_of_week[7] {
            days_of_week[0] = true;
        }
        days_of_week.truncate(7);

        Ok(Self {
            source: expression.trim().to_string(),
            minutes: parse_field(parts[0], 0, 59)?,
            hours: parse_field(parts[1], 0, 23)?,
            days_of_month: parse_field(parts[2], 1, 31)?,
            months: parse_field(parts[3], 1, 12)?,
            days_of_week,
            dom_any: parts[2] == "*",
            dow_any: parts[4] == "*",
        })
    }

    /// The expression as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// First matching minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let mut date = start.date_naive();
        let mut time = Some(start.time());
        let limit = after.year() + SEARCH_YEARS;

        while date.year() <= limit {
            if !self.months[date.month() as usize] {
                date = first_of_next_month(date)?;
                time = None;
                continue;
            }
            if self.day_matches(date) {
                let from = time.unwrap_or(NaiveTime::MIN);
                if let Some(at) = self.first_time_from(from) {
                    return Some(date.and_time(at).and_utc());
                }
            }
            date = date.succ_opt()?;
            time = None;
        }
        None
    }

    /// Standard cron rule: when both day fields are restricted, either may match.
    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.days_of_month[date.day() as usize];
        let dow = self.days_of_week[date.weekday().num_days_from_sunday() as usize];
        match (self.dom_any, self.dow_any) {
            (true, true) => true,
            (true, false) => dow,
            (false, true) => dom,
            (false, false) => dom || dow,
        }
    }

    fn first_time_from(&self, from: NaiveTime) -> Option<NaiveTime> {
        for hour in from.hour()..24 {
            if !self.hours[hour as usize] {
                continue;
            }
            let first_minute = if hour == from.hour() { from.minute() } else { 0 };
            for minute in first_minute..60 {
                if self.minutes[minute as usize] {
                    return NaiveTime::from_hms_opt(hour, minute, 0);
                }
            }
        }
        None
    }
}

impl FromStr for CronSchedule {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Parse a cron field into a lookup table indexed by value (`0..=max`).
fn parse_field(field: &str, min: u32, max: u32) -> Result<Vec<bool>> {
    let mut table = vec![false; max as usize + 1];
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| CourierError::cron(format!("bad step in '{field}'")))?;
                if step == 0 {
                    return Err(CourierError::cron(format!("zero step in '{field}'")));
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (value(lo, field)?, value(hi, field)?)
        } else {
            let n = value(range, field)?;
            // `N/step` runs from N to the end of the range.
            if step > 1 { (n, max) } else { (n, n) }
        };

        if lo < min || hi > max || lo > hi {
            return Err(CourierError::cron(format!(
                "'{part}' out of range {min}-{max}"
            )));
        }
        for v in (lo..=hi).step_by(step as usize) {
            table[v as usize] = true;
        }
    }
    Ok(table)
}

fn value(s: &str, field: &str) -> Result<u32> {
    s.trim()
        .parse()
        .map_err(|_| CourierError::cron(format!("'{s}' is not a number in '{field}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn next(expr: &str, after: DateTime<Utc>) -> DateTime<Utc> {
        CronSchedule::parse(expr).unwrap().next_after(after).unwrap()
    }

    #[test]
    fn test_every_hour() {
        assert_eq!(next("0 * * * *", at(2026, 2, 22, 10, 30)), at(2026, 2, 22, 11, 0));
    }

    #[test]
    fn test_specific_time() {
        assert_eq!(next("0 8 * * *", at(2026, 2, 22, 7, 0)), at(2026, 2, 22, 8, 0));
        assert_eq!(next("0 8 * * *", at(2026, 2, 22, 8, 0)), at(2026, 2, 23, 8, 0));
    }

    #[test]
    fn test_every_15_minutes() {
        assert_eq!(next("*/15 * * * *", at(2026, 2, 22, 10, 2)), at(2026, 2, 22, 10, 15));
        assert_eq!(next("*/15 * * * *", at(2026, 2, 22, 10, 45)), at(2026, 2, 22, 11, 0));
    }

    #[test]
    fn test_seconds_are_ignored() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 2, 59).unwrap();
        assert_eq!(next("* * * * *", after), at(2026, 2, 22, 10, 3));
    }

    #[test]
    fn test_ranges_and_lists() {
        // 2026-02-21 is a Saturday.
        assert_eq!(next("30 9 * * 1-5", at(2026, 2, 21, 12, 0)), at(2026, 2, 23, 9, 30));
        assert_eq!(next("0 9-17/4 * * *", at(2026, 2, 22, 10, 0)), at(2026, 2, 22, 13, 0));
        assert_eq!(next("5,50 * * * *", at(2026, 2, 22, 10, 10)), at(2026, 2, 22, 10, 50));
    }

    #[test]
    fn test_month_and_day_of_month() {
        assert_eq!(next("0 0 1 * *", at(2026, 2, 22, 10, 0)), at(2026, 3, 1, 0, 0));
        assert_eq!(next("0 12 25 12 *", at(2026, 2, 22, 10, 0)), at(2026, 12, 25, 12, 0));
        assert_eq!(next("0 0 29 2 *", at(2026, 3, 1, 0, 0)), at(2028, 2, 29, 0, 0));
    }

    #[test]
    fn test_sunday_alias() {
        let seven = CronSchedule::parse("0 0 * * 7").unwrap();
        let zero = CronSchedule::parse("0 0 * * 0").unwrap();
        let after = at(2026, 2, 18, 0, 0);
        assert_eq!(seven.next_after(after), zero.next_after(after));
        assert_eq!(seven.next_after(after), Some(at(2026, 2, 22, 0, 0)));
    }

    #[test]
    fn test_either_day_field_matches_when_both_restricted() {
        // 1st of the month OR a Friday; 2026-02-27 is a Friday.
        assert_eq!(next("0 0 1 * 5", at(2026, 2, 22, 0, 0)), at(2026, 2, 27, 0, 0));
    }

    #[test]
    fn test_impossible_date_never_fires() {
        let never = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert!(never.next_after(at(2026, 1, 1, 0, 0)).is_none());
    }

    #[test]
    fn test_invalid_expression() {
        for bad in ["bad", "* * * *", "60 * * * *", "*/0 * * * *", "5-1 * * * *", "a * * * *"] {
            assert!(
                matches!(CronSchedule::parse(bad), Err(CourierError::Cron(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_source_roundtrip() {
        let cron: CronSchedule = " */5 * * * * ".parse().unwrap();
        assert_eq!(cron.source(), "*/5 * * * *");
        assert_eq!(cron.to_string(), "*/5 * * * *");
    }
}
