//! Lenient timestamp decoding for agent payloads.
//!
//! Agents emit RFC 3339, but some send naive ISO 8601 without an offset;
//! those are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, IgnoredAny};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub(crate) fn parse(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Required timestamp; unparseable text is an error.
pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse(&text).ok_or_else(|| de::Error::custom(format!("unrecognised timestamp {text:?}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Other(IgnoredAny),
}

/// Optional timestamp; anything that is not a recognisable timestamp string
/// becomes `None` instead of failing the whole payload.
pub(crate) fn deserialize_lenient<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawValue>::deserialize(deserializer)? {
        Some(RawValue::Text(text)) => parse(&text),
        Some(RawValue::Other(_)) | None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offset_and_naive_forms_are_accepted() {
        let expected = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(parse("2026-05-01T09:00:00Z"), Some(expected));
        assert_eq!(parse("2026-05-01T11:00:00+02:00"), Some(expected));
        assert_eq!(parse("2026-05-01T09:00:00"), Some(expected));
        assert_eq!(parse("2026-05-01 09:00:00"), Some(expected));
        assert_eq!(
            parse("2026-05-01T09:00:00.123456"),
            Some(expected + chrono::Duration::microseconds(123_456))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse(""), None);
    }
}
