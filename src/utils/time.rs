//! Timestamp helpers.  `serialize`/`deserialize` handle RFC 3339 for `#[serde(with = "...")]`.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

const CLOCK: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Formats the time of day as `HH:MM:SS`, for message headers.
pub fn format_clock(datetime: OffsetDateTime) -> String {
    datetime
        .format(CLOCK)
        .unwrap_or_else(|_| "--:--:--".to_string())
}

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}
