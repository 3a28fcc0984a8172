use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// `YYYYMMDDhhmmss`, always in UTC.
pub const GATEWAY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn gateway_timestamp(at: DateTime<Utc>) -> String {
    at.format(GATEWAY_TIMESTAMP_FORMAT).to_string()
}

/// Parses the `timestamp` field of a gateway message.
///
/// The documented form is 14 digits (`YYYYMMDDhhmmss`, UTC). Unix epoch seconds (10 digits) and milliseconds
/// (13 digits) are also seen in the wild and are accepted.
pub fn parse_gateway_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match value.len() {
        14 => NaiveDateTime::parse_from_str(value, GATEWAY_TIMESTAMP_FORMAT).ok().map(|dt| dt.and_utc()),
        10 => value.parse::<i64>().ok().and_then(|s| Utc.timestamp_opt(s, 0).single()),
        13 => value.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip_gateway_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 31, 12, 30, 45).unwrap();
        assert_eq!(gateway_timestamp(at), "20240531123045");
        assert_eq!(parse_gateway_timestamp("20240531123045"), Some(at));
    }

    #[test]
    fn epoch_forms() {
        let at = Utc.with_ymd_and_hms(2024, 5, 31, 12, 30, 45).unwrap();
        assert_eq!(parse_gateway_timestamp("1717158645"), Some(at));
        assert_eq!(parse_gateway_timestamp("1717158645000"), Some(at));
    }

    #[test]
    fn junk_is_rejected() {
        for bad in ["", "2024-05-31", "20241331123045", "12345", "-1717158645", "17171586450001"] {
            assert_eq!(parse_gateway_timestamp(bad), None, "{bad}");
        }
    }
}
