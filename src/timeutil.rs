use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

pub fn to_zone(instant: DateTime<Utc>, zone: Tz) -> DateTime<Tz> {
    instant.with_timezone(&zone)
}

pub fn to_utc<Z: TimeZone>(local: DateTime<Z>) -> DateTime<Utc> {
    local.with_timezone(&Utc)
}

/// Wall-clock rendering used in user-facing confirmations and listings.
pub fn format_for_user(instant: DateTime<Utc>, zone: Tz) -> String {
    to_zone(instant, zone)
        .format("%A, %B %d at %I:%M %p")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Singapore;

    #[test]
    fn utc_instant_renders_as_singapore_wall_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap();
        let local = to_zone(instant, Singapore);

        assert_eq!(local.to_rfc3339(), "2024-01-01T12:00:00+08:00");
    }

    #[test]
    fn zone_conversion_round_trips() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 15, 23, 30, 0).unwrap();

        assert_eq!(to_utc(to_zone(instant, Singapore)), instant);
    }

    #[test]
    fn user_format_is_readable() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap();

        assert_eq!(
            format_for_user(instant, Singapore),
            "Monday, January 01 at 12:00 PM"
        );
    }
}
