use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::AppError;

/// Wire and storage layout for `created_at` / `updated_at`.
const DB_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Render an instant as `YYYY-MM-DD HH:MM:SS`, normalized to UTC and truncated to seconds.
pub fn format_db_timestamp(dt: OffsetDateTime) -> Result<String, AppError> {
    dt.to_offset(UtcOffset::UTC).format(DB_TIMESTAMP).map_err(|e| {
        AppError::storage("TIMESTAMP_FORMAT_FAILED", "Failed to format timestamp")
            .with_details(e.to_string())
    })
}

pub fn parse_db_timestamp(raw: &str) -> Result<OffsetDateTime, AppError> {
    PrimitiveDateTime::parse(raw.trim(), DB_TIMESTAMP)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| {
            AppError::storage("TIMESTAMP_PARSE_FAILED", "Stored timestamp is malformed")
                .with_details(format!("value={raw}; err={e}"))
        })
}

/// Next `updated_at` for a record last touched at `previous`.
///
/// Stored timestamps have one-second resolution, so two mutations within the same second
/// would otherwise collide; the result is always strictly after `previous`.
pub fn next_updated_at(previous: &str, now: OffsetDateTime) -> Result<String, AppError> {
    let previous = parse_db_timestamp(previous)?;
    let now = now
        .to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| {
            AppError::storage("TIMESTAMP_FORMAT_FAILED", "Failed to truncate timestamp")
                .with_details(e.to_string())
        })?;
    let next = if now > previous {
        now
    } else {
        previous + Duration::seconds(1)
    };
    format_db_timestamp(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_utc_without_fraction() {
        let dt = datetime!(2026-03-04 05:06:07.891 +02:00);
        assert_eq!(format_db_timestamp(dt).unwrap(), "2026-03-04 03:06:07");
    }

    #[test]
    fn parses_stored_layout() {
        let dt = parse_db_timestamp("2026-03-04 03:06:07").unwrap();
        assert_eq!(dt, datetime!(2026-03-04 03:06:07 UTC));
        assert!(parse_db_timestamp("2026-03-04T03:06:07Z").is_err());
    }

    #[test]
    fn next_updated_at_uses_now_when_later() {
        let next = next_updated_at("2026-01-01 00:00:00", datetime!(2026-01-01 00:00:05.5 UTC));
        assert_eq!(next.unwrap(), "2026-01-01 00:00:05");
    }

    #[test]
    fn next_updated_at_is_strictly_increasing_within_a_second() {
        let next = next_updated_at("2026-01-01 00:00:05", datetime!(2026-01-01 00:00:05.2 UTC));
        assert_eq!(next.unwrap(), "2026-01-01 00:00:06");

        // Clock behind the stored value still moves forward.
        let next = next_updated_at("2026-01-01 00:00:05", datetime!(2025-12-31 23:00:00 UTC));
        assert_eq!(next.unwrap(), "2026-01-01 00:00:06");
    }
}
