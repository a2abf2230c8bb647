//! Per-row cleaning rules for the activity export.
//!
//! A row is kept only when its teacher email is valid and its attendance
//! flag (`zam`) is `"0"`. Kept rows gain `timeSpentMinutes`, `cleanedEmail`
//! and `COVID`, and have a few fields rewritten. Time and date values that do
//! not parse fall back to `0`; they never drop the row or raise an error.

use crate::domain::model::{DropReason, Record, RowOutcome};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TEACHER_EMAIL: &str = "teacherEmail";
pub const ZAM: &str = "zam";
pub const TIME_SPENT: &str = "timeSpent";
pub const DATE_CREATED: &str = "dateCreated";
pub const EXERCISE_DESCRIPTION: &str = "exerciseDescription";
pub const FROM: &str = "from";
pub const B4: &str = "b4";

pub const TIME_SPENT_MINUTES: &str = "timeSpentMinutes";
pub const CLEANED_EMAIL: &str = "cleanedEmail";
pub const COVID: &str = "COVID";

pub const MAX_MINUTES: u64 = 60;

const COVID_START: NaiveDate = match NaiveDate::from_ymd_opt(2020, 3, 13) {
    Some(date) => date,
    None => panic!("invalid COVID window start"),
};

const COVID_END: NaiveDate = match NaiveDate::from_ymd_opt(2021, 5, 30) {
    Some(date) => date,
    None => panic!("invalid COVID window end"),
};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern is valid"));

/// Replace `field` with `to` when it equals `from` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRemap {
    pub field: String,
    pub from: String,
    pub to: String,
}

/// Append `suffix` to `field`; a missing field counts as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAppend {
    pub field: String,
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRules {
    pub max_minutes: u64,
    pub attendance_value: String,
    /// Both bounds are midnight of the given day and inclusive.
    pub covid_start: NaiveDate,
    pub covid_end: NaiveDate,
    pub remaps: Vec<ValueRemap>,
    pub appends: Vec<FieldAppend>,
}

impl Default for TransformRules {
    fn default() -> Self {
        Self {
            max_minutes: MAX_MINUTES,
            attendance_value: "0".to_string(),
            covid_start: COVID_START,
            covid_end: COVID_END,
            remaps: vec![
                ValueRemap {
                    field: EXERCISE_DESCRIPTION.to_string(),
                    from: "cvičení s celou třídou".to_string(),
                    to: "Modes of the work with the activity".to_string(),
                },
                ValueRemap {
                    field: FROM.to_string(),
                    from: "free".to_string(),
                    to: "Fred".to_string(),
                },
            ],
            appends: vec![FieldAppend {
                field: B4.to_string(),
                suffix: " [https://dejepisplus.npi.cz/historicka-gramotnost/]".to_string(),
            }],
        }
    }
}

/// Normalizes a raw email cell and validates it.
///
/// The first comma becomes a period, then the value is trimmed and
/// lower-cased. Returns `None` for non-string values and
/// for anything that is not `local@domain.tld` with a single `@`.
pub fn clean_email(raw: &Value) -> Option<String> {
    let raw = raw.as_str()?;
    let cleaned = raw.replacen(',', ".", 1).trim().to_lowercase();
    EMAIL_RE.is_match(&cleaned).then_some(cleaned)
}

/// `H:M:S` or `M:S` to whole minutes, capped at [`MAX_MINUTES`].
pub fn convert_to_minutes(time: &str) -> u64 {
    convert_to_minutes_capped(time, MAX_MINUTES)
}

pub fn convert_to_minutes_capped(time: &str, max_minutes: u64) -> u64 {
    if time.is_empty() {
        return 0;
    }

    let parts: Option<Vec<u64>> = time.split(':').map(parse_time_field).collect();
    let minutes = match parts.as_deref() {
        Some([h, m, s]) => h.saturating_mul(60).saturating_add(*m).saturating_add(s / 60),
        Some([m, s]) => m.saturating_add(s / 60),
        _ => 0,
    };

    minutes.min(max_minutes)
}

// An empty field reads as zero, so "5:" is five minutes.
fn parse_time_field(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() {
        Some(0)
    } else {
        field.parse().ok()
    }
}

/// Parses `D.M.Y H:M`, e.g. `13.3.2020 14:30`, as a local timestamp.
/// Any seconds after the minute are ignored.
pub fn parse_czech_date(value: &str) -> Option<NaiveDateTime> {
    let mut parts = value.split('.');
    let (day, month, year_time) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let mut year_time = year_time.split_whitespace();
    let (year, time) = (year_time.next()?, year_time.next()?);
    if year_time.next().is_some() {
        return None;
    }

    let mut hour_minute = time.split(':');
    let (hour, minute) = (hour_minute.next()?, hour_minute.next()?);

    let date = NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )?;
    let time = NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)?;

    Some(date.and_time(time))
}

pub fn is_covid_period(timestamp: NaiveDateTime, rules: &TransformRules) -> bool {
    match (
        rules.covid_start.and_hms_opt(0, 0, 0),
        rules.covid_end.and_hms_opt(0, 0, 0),
    ) {
        (Some(start), Some(end)) => timestamp >= start && timestamp <= end,
        _ => false,
    }
}

/// Applies [`TransformRules`] to one row at a time. Holds no state between
/// rows.
#[derive(Debug, Clone, Default)]
pub struct RowTransformer {
    rules: TransformRules,
}

impl RowTransformer {
    pub fn new(rules: TransformRules) -> Self {
        Self { rules }
    }

    pub fn process(&self, mut record: Record) -> RowOutcome {
        let Some(cleaned_email) = record.get(TEACHER_EMAIL).and_then(clean_email) else {
            return RowOutcome::Dropped(DropReason::InvalidEmail);
        };
        if record.get_str(ZAM) != Some(self.rules.attendance_value.as_str()) {
            return RowOutcome::Dropped(DropReason::NotAttended);
        }

        let minutes = record
            .get_str(TIME_SPENT)
            .map(|t| convert_to_minutes_capped(t, self.rules.max_minutes))
            .unwrap_or(0);
        let covid = record
            .get_str(DATE_CREATED)
            .and_then(parse_czech_date)
            .map(|ts| is_covid_period(ts, &self.rules))
            .unwrap_or(false);

        record.set(TIME_SPENT_MINUTES, minutes);
        record.set(CLEANED_EMAIL, cleaned_email);
        record.set(COVID, u8::from(covid));

        for remap in &self.rules.remaps {
            if record.get_str(&remap.field) == Some(remap.from.as_str()) {
                record.set(&remap.field, remap.to.as_str());
            }
        }

        for append in &self.rules.appends {
            let value = format!("{}{}", record.cell(&append.field), append.suffix);
            record.set(&append.field, value);
        }

        RowOutcome::Retained(record)
    }
}
