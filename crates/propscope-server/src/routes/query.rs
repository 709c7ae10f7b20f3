use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::AppError;

/// Longest event name, property name or search term accepted.
pub(crate) const MAX_FILTER_LEN: usize = 255;

/// Parse a required epoch-milliseconds timestamp.
pub(crate) fn parse_epoch_ms(value: Option<&str>, field: &str) -> Result<DateTime<Utc>, AppError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Err(AppError::BadRequest(format!("{field} is required")));
    };
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| {
            AppError::BadRequest(format!("invalid {field} (expected epoch milliseconds)"))
        })
}

/// Parse the required `startAt`/`endAt` pair.
pub(crate) fn parse_time_range(
    start_at: Option<&str>,
    end_at: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start = parse_epoch_ms(start_at, "startAt")?;
    let end = parse_epoch_ms(end_at, "endAt")?;
    if end < start {
        return Err(AppError::BadRequest(
            "endAt must be on or after startAt".to_string(),
        ));
    }
    Ok((start, end))
}

/// Parse a positive integer parameter, falling back to `default` when absent.
pub(crate) fn parse_positive_u32(
    value: Option<&str>,
    field: &str,
    default: u32,
    max: Option<u32>,
) -> Result<u32, AppError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    let parsed = raw
        .parse::<u32>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| AppError::BadRequest(format!("{field} must be a positive integer")))?;
    if let Some(max) = max {
        if parsed > max {
            return Err(AppError::BadRequest(format!(
                "{field} must be {max} or less"
            )));
        }
    }
    Ok(parsed)
}

pub(crate) fn parse_optional_timezone(value: Option<&str>) -> Result<Option<Tz>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<Tz>()
            .map(Some)
            .map_err(|_| AppError::BadRequest("invalid timezone".to_string())),
    }
}

/// Trim an optional text filter; blank counts as absent.
pub(crate) fn normalize_optional_filter(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > max_len {
        return Err(AppError::BadRequest(format!(
            "{field} is too long (max {max_len} characters)"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

pub(crate) fn parse_optional_bool(
    value: Option<&str>,
    field: &str,
) -> Result<Option<bool>, AppError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        _ => Err(AppError::BadRequest(format!(
            "{field} must be one of: true, false, 1, 0"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_bool_accepts_common_variants() {
        assert_eq!(
            parse_optional_bool(Some("true"), "sortDescending").expect("bool"),
            Some(true)
        );
        assert_eq!(
            parse_optional_bool(Some("0"), "sortDescending").expect("bool"),
            Some(false)
        );
        assert_eq!(parse_optional_bool(None, "sortDescending").expect("bool"), None);
        assert!(parse_optional_bool(Some("yes"), "sortDescending").is_err());
    }

    #[test]
    fn time_range_requires_both_bounds_in_order() {
        assert!(parse_time_range(None, Some("1000")).is_err());
        assert!(parse_time_range(Some("1000"), None).is_err());
        assert!(parse_time_range(Some("2000"), Some("1000")).is_err());
        assert!(parse_time_range(Some("soon"), Some("1000")).is_err());

        let (start, end) = parse_time_range(Some("1717200000000"), Some("1717286400000"))
            .expect("range");
        assert_eq!(start.timestamp_millis(), 1_717_200_000_000);
        assert_eq!((end - start).num_hours(), 24);
    }

    #[test]
    fn page_numbers_default_and_are_bounded() {
        assert_eq!(parse_positive_u32(None, "page", 1, None).expect("page"), 1);
        assert_eq!(parse_positive_u32(Some(" 3 "), "page", 1, None).expect("page"), 3);
        assert!(parse_positive_u32(Some("0"), "page", 1, None).is_err());
        assert!(parse_positive_u32(Some("-2"), "page", 1, None).is_err());
        assert!(parse_positive_u32(Some("501"), "pageSize", 20, Some(500)).is_err());
        assert_eq!(
            parse_positive_u32(Some("500"), "pageSize", 20, Some(500)).expect("size"),
            500
        );
    }

    #[test]
    fn timezone_must_be_iana_name() {
        assert_eq!(parse_optional_timezone(None).expect("tz"), None);
        assert_eq!(parse_optional_timezone(Some("  ")).expect("tz"), None);
        assert_eq!(
            parse_optional_timezone(Some("Europe/Berlin")).expect("tz"),
            Some(chrono_tz::Europe::Berlin)
        );
        assert!(parse_optional_timezone(Some("Mars/Olympus")).is_err());
    }

    #[test]
    fn blank_filters_are_absent_and_long_ones_rejected() {
        assert_eq!(
            normalize_optional_filter("eventName", Some("  ".into()), MAX_FILTER_LEN)
                .expect("filter"),
            None
        );
        assert_eq!(
            normalize_optional_filter("eventName", Some(" signup ".into()), MAX_FILTER_LEN)
                .expect("filter"),
            Some("signup".to_string())
        );
        assert!(normalize_optional_filter("eventName", Some("x".repeat(256)), MAX_FILTER_LEN)
            .is_err());
    }
}
