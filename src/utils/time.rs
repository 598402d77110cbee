//! Calendar helpers for retention cutoffs and daily limits.

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Start of the local day `days` days before `now`, expressed in UTC.
///
/// On a DST gap the earliest valid instant after local midnight is used.
pub fn midnight_n_days_ago(days: u64, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_date = now.with_timezone(&tz).date_naive();
    let date = local_date.checked_sub_days(Days::new(days)).unwrap_or(local_date);
    let midnight = date.and_time(NaiveTime::MIN);

    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a transition; one hour later always exists.
        None => tz
            .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or(now),
    }
}

pub fn midnight_today(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    midnight_n_days_ago(0, tz, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midnight_is_local() {
        let now = Utc.with_ymd_and_hms(2026, 3, 20, 15, 30, 0).unwrap();
        let cutoff = midnight_n_days_ago(3, chrono_tz::America::Toronto, now);
        // 2026-03-17 00:00 EDT
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 3, 17, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_late_utc_evening_is_still_previous_local_day() {
        // 02:00 UTC on the 21st is 22:00 on the 20th in Toronto.
        let now = Utc.with_ymd_and_hms(2026, 3, 21, 2, 0, 0).unwrap();
        let today = midnight_today(chrono_tz::America::Toronto, now);
        assert_eq!(today, Utc.with_ymd_and_hms(2026, 3, 20, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_utc_zone() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(
            midnight_n_days_ago(7, chrono_tz::UTC, now),
            Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap()
        );
    }
}
