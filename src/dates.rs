//! Date encoding helpers.
//!
//! `deliveryDate` is a plain calendar date (`YYYY-MM-DD`); every other
//! timestamp is a full RFC 3339 instant. Decoding is lenient so records
//! written by older clients still load: delivery dates stored as full
//! instants are reduced to their UTC date, and naive `YYYY-MM-DDTHH:MM`
//! form values are read as local time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a calendar date, accepting a full instant as a fallback
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if raw.contains('T') {
        return parse_instant(raw).map(|instant| instant.date_naive());
    }
    None
}

/// Parse an instant: RFC 3339 first, then naive local datetime forms
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc));
        }
    }
    None
}

/// Parse a user-supplied date argument
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    parse_date(raw)
        .ok_or_else(|| Error::InvalidArgument(format!("invalid date '{raw}' (expected YYYY-MM-DD)")))
}

/// Parse a user-supplied instant argument
pub fn parse_instant_arg(raw: &str) -> Result<DateTime<Utc>> {
    parse_instant(raw).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "invalid timestamp '{raw}' (expected RFC 3339 or YYYY-MM-DDTHH:MM)"
        ))
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `2024-03-09T10:00:00.000Z`, millisecond precision
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Last representable millisecond of `date` in `tz` (23:59:59.999)
pub fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    local_instant(date.and_time(time), tz)
}

/// First instant of `date` in `tz`
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    local_instant(date.and_time(NaiveTime::MIN), tz)
}

fn local_instant<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> DateTime<Tz> {
    // DST gaps have no local mapping; fall back to reading the wall clock as UTC.
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Serde support for `Option<NaiveDate>` fields
pub mod lenient_date {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_date(value)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{value}'"))),
        }
    }
}

/// Serde support for `Option<DateTime<Utc>>` fields
pub mod lenient_instant {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(instant) => serializer.serialize_str(&format_instant(instant)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_instant(value)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{value}'"))),
        }
    }
}

/// Serde support for required `DateTime<Utc>` fields
pub mod instant {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_instant(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_instant(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}
