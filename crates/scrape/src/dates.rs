//! Date-divider label parsing.
//!
//! The feed marks day boundaries with labels such as "Friday, 17 May",
//! "12 December 2023", "Today 10:02" or "Yesterday 09:00". Formats are tried
//! in a fixed order and the first one that parses wins.

use backscroll_core::{Error, Result};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Source of "today" for the relative label formats.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The machine's local calendar date.
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same date.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

type LabelFormat = fn(&str, NaiveDate) -> Option<NaiveDateTime>;

const FORMATS: [LabelFormat; 4] = [weekday_day_month, day_month_year, today_at, yesterday_at];

/// Parse a divider label relative to `today`.
///
/// Year-less labels take `today`'s year. Date-only labels resolve to midnight.
pub fn parse_divider_label(label: &str, today: NaiveDate) -> Result<NaiveDateTime> {
    let label = label.trim();
    FORMATS
        .iter()
        .find_map(|format| format(label, today))
        .ok_or_else(|| Error::DateParse(label.to_string()))
}

/// "Friday, 17 May". The weekday must be a weekday name; it is not checked
/// against the resolved date.
fn weekday_day_month(label: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let (weekday, rest) = label.split_once(',')?;
    weekday.trim().parse::<Weekday>().ok()?;
    let with_year = format!("{} {}", rest.trim(), today.year());
    NaiveDate::parse_from_str(&with_year, "%d %B %Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

/// "12 December 2023"
fn day_month_year(label: &str, _today: NaiveDate) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(label, "%d %B %Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

/// "Today 10:02"
fn today_at(label: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let time = relative_time(label, "Today")?;
    Some(today.and_time(time))
}

/// "Yesterday 09:00"
fn yesterday_at(label: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let time = relative_time(label, "Yesterday")?;
    Some(today.checked_sub_days(Days::new(1))?.and_time(time))
}

fn relative_time(label: &str, word: &str) -> Option<NaiveTime> {
    let rest = label.strip_prefix(word)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    NaiveTime::parse_from_str(rest.trim(), "%H:%M").ok()
}
