//! Schedule strings and due-time evaluation.
//!
//! A schedule string is exactly `"<frequency> <HH:mm>"`, with frequency one
//! of `daily`, `weekly`, `monthly`. Hours may be written with one or two
//! digits (`9:00`, `09:00`), minutes always with two. All times are UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use shared_types::{ReportKind, ScheduleId};

use super::entities::DateRange;
use super::errors::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    /// Sundays only.
    Weekly,
    /// First day of the month only.
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Range covered by a run at `now`: the preceding day, week or month.
    pub fn lookback(self, now: DateTime<Utc>) -> DateRange {
        let start = match self {
            Self::Daily => now - Duration::days(1),
            Self::Weekly => now - Duration::days(7),
            Self::Monthly => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
        };
        DateRange::new(start, now)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `"<frequency> <HH:mm>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub frequency: Frequency,
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleSpec {
    /// Whether a run is due in the minute containing `now`.
    pub fn matches(&self, now: DateTime<Utc>) -> bool {
        if now.hour() != self.hour || now.minute() != self.minute {
            return false;
        }
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => now.weekday() == Weekday::Sun,
            Frequency::Monthly => now.day() == 1,
        }
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}", self.frequency, self.hour, self.minute)
    }
}

impl FromStr for ScheduleSpec {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ReportError::InvalidSchedule(format!("{s:?}: {reason}"));

        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [frequency, time] = tokens.as_slice() else {
            return Err(invalid("expected \"<frequency> <HH:mm>\""));
        };
        let frequency = match *frequency {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            _ => return Err(invalid("frequency must be daily, weekly or monthly")),
        };
        let (hour, minute) = parse_time(time).ok_or_else(|| invalid("time must be HH:mm"))?;

        Ok(Self {
            frequency,
            hour,
            minute,
        })
    }
}

/// Hour: one or two digits, 0..=23. Minute: exactly two digits, 00..=59.
fn parse_time(time: &str) -> Option<(u32, u32)> {
    let (hour, minute) = time.split_once(':')?;
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    if !(1..=2).contains(&hour.len()) || !all_digits(hour) {
        return None;
    }
    if minute.len() != 2 || !all_digits(minute) {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

/// A stored report schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSchedule {
    pub id: ScheduleId,
    pub kind: ReportKind,
    pub template_id: String,
    pub spec: ScheduleSpec,
    pub recipients: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Start of the minute this schedule last ran in.
    pub last_run: Option<DateTime<Utc>>,
}

impl ReportSchedule {
    /// Due at `now` and not already run in this minute.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active && self.spec.matches(now) && self.last_run != Some(minute_floor(now))
    }

    pub fn mark_run(&mut self, now: DateTime<Utc>) {
        self.last_run = Some(minute_floor(now));
    }
}

fn minute_floor(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}
