use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

pub fn now_local(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

pub fn today(tz: Tz) -> NaiveDate {
    now_local(tz).date_naive()
}

/// Calendar date of a stored UTC timestamp, as seen in the business zone.
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

pub fn local_time(ts: DateTime<Utc>, tz: Tz) -> NaiveTime {
    ts.with_timezone(&tz).time()
}

/// UTC instants `[start, end)` covering the local dates `from..=to`.
/// `None` when `to` is the last representable date.
pub fn utc_range(from: NaiveDate, to: NaiveDate, tz: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let after = to.succ_opt()?;
    Some((midnight_utc(from, tz), midnight_utc(after, tz)))
}

fn midnight_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::default());
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub fn format_scan_time(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%d %b %Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Jakarta;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn late_utc_evening_is_next_local_day() {
        // 18:30 UTC is 01:30 the next morning in UTC+7
        let ts = utc(2026, 10, 17, 18, 30);
        assert_eq!(local_date(ts, Jakarta), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(local_time(ts, Jakarta), NaiveTime::from_hms_opt(1, 30, 0).unwrap());
    }

    #[test]
    fn range_covers_whole_local_days() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let (start, end) = utc_range(day, day, Jakarta).unwrap();
        assert_eq!(start, utc(2026, 10, 17, 17, 0));
        assert_eq!(end, utc(2026, 10, 18, 17, 0));
    }

    #[test]
    fn range_ending_on_the_last_date_is_none() {
        assert_eq!(utc_range(NaiveDate::MAX, NaiveDate::MAX, Jakarta), None);
    }

    #[test]
    fn formats_in_local_time() {
        let ts = utc(2026, 10, 18, 1, 5);
        assert_eq!(format_scan_time(ts, Jakarta), "18 Oct 2026 08:05:00");
    }
}
