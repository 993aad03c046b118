//! Backend timestamps.
//!
//! The backend emits zone-less ISO-8601 date-times (`2025-03-01T09:30:00`),
//! occasionally with fractional seconds, and some proxies rewrite them to
//! RFC 3339. Both forms are accepted; RFC 3339 values are normalised to UTC.

use chrono::{DateTime, NaiveDateTime};

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let raw = raw.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.naive_utc()),
        Err(_) => NaiveDateTime::parse_from_str(raw, LOCAL_FORMAT),
    }
}

/// Date part only, as shown on status pages.
pub fn format_date(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Serde adapter for optional timestamps.
pub mod option {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.filter(|s| !s.trim().is_empty())
            .map(|s| super::parse(&s).map_err(D::Error::custom))
            .transpose()
    }
}
