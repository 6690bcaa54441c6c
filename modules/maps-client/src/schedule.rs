use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};

/// The canonical reference departure: the next Tuesday at 08:00 UTC
/// (roughly 09:00 in Bremen during winter time). Always strictly in the
/// future relative to `now`.
pub fn next_tuesday_0800_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.weekday().num_days_from_monday() as i64;
    let tuesday = Weekday::Tue.num_days_from_monday() as i64;
    let mut days_ahead = (tuesday - today).rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }

    (now + Duration::days(days_ahead))
        .with_hour(8)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("08:00:00 is always a valid time of day")
}

/// Canonical departure as an RFC 3339 timestamp (Routes API).
pub fn departure_rfc3339(now: DateTime<Utc>) -> String {
    next_tuesday_0800_utc(now).format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Canonical departure as epoch seconds (Directions API).
pub fn departure_unix(now: DateTime<Utc>) -> i64 {
    next_tuesday_0800_utc(now).timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_tuesday_from_a_monday() {
        // Monday 2025-06-02 10:30 UTC -> Tuesday 2025-06-03 08:00 UTC.
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap();
        let dep = next_tuesday_0800_utc(now);
        assert_eq!(dep, Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap());
    }

    #[test]
    fn a_tuesday_rolls_over_to_the_following_week() {
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 7, 0, 0).unwrap();
        let dep = next_tuesday_0800_utc(now);
        assert_eq!(dep, Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn rfc3339_and_unix_describe_the_same_instant() {
        let now = Utc.with_ymd_and_hms(2025, 6, 5, 23, 59, 59).unwrap();
        let rfc = departure_rfc3339(now);
        let unix = departure_unix(now);
        assert_eq!(rfc, "2025-06-10T08:00:00Z");
        assert_eq!(
            unix,
            Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap().timestamp()
        );
    }
}
