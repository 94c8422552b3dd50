use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::schedule::ScheduleStatus;
use crate::service::attendance_rules::{AttendanceStatus, ScheduleFacts, classify};

/// One calendar cell. `status` drives the dot, `sessions`/`present` the
/// detail list on multi-session days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CalendarDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub sessions: u32,
    pub present: u32,
}

/// Which status a day shows when its schedules disagree.
fn rank(status: AttendanceStatus) -> u8 {
    match status {
        AttendanceStatus::Present => 5,
        AttendanceStatus::OnGoing => 4,
        AttendanceStatus::Scheduled => 3,
        AttendanceStatus::Absent => 2,
        AttendanceStatus::Cancelled => 1,
    }
}

/// Builds the per-date view for one subject.
///
/// `scans` counts scan events per local date. Every schedule on a scanned
/// date classifies as present, so the partial-attendance figure comes from
/// the scan count capped at the number of non-cancelled sessions that day.
/// Scans on a date with no schedule still show a present day.
pub fn build_calendar(
    schedules: &[(NaiveDate, ScheduleStatus)],
    scans: &BTreeMap<NaiveDate, u32>,
    today: NaiveDate,
) -> Vec<CalendarDay> {
    let attended: BTreeSet<NaiveDate> = scans.keys().copied().collect();
    let mut days: BTreeMap<NaiveDate, (AttendanceStatus, u32, u32)> = BTreeMap::new();

    for (date, status) in schedules {
        let classified = classify(&ScheduleFacts {
            date: *date,
            status: *status,
            attended_dates: &attended,
            today,
        });
        let countable = u32::from(*status != ScheduleStatus::Cancelled);
        let entry = days.entry(*date).or_insert((classified, 0, 0));
        if rank(classified) > rank(entry.0) {
            entry.0 = classified;
        }
        entry.1 += countable;
    }

    for (date, count) in scans {
        let entry = days
            .entry(*date)
            .or_insert((AttendanceStatus::Present, 0, 0));
        entry.0 = AttendanceStatus::Present;
        entry.2 = if entry.1 == 0 { *count } else { (*count).min(entry.1) };
    }

    days.into_iter()
        .map(|(date, (status, sessions, present))| CalendarDay {
            date,
            status,
            sessions,
            present,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn collapses_multiple_scans_into_one_present_day() {
        let schedules = vec![(day(5), ScheduleStatus::Completed)];
        let scans = BTreeMap::from([(day(5), 3)]);
        let cal = build_calendar(&schedules, &scans, day(18));
        assert_eq!(
            cal,
            vec![CalendarDay {
                date: day(5),
                status: AttendanceStatus::Present,
                sessions: 1,
                present: 1,
            }]
        );
    }

    #[test]
    fn tracks_partial_attendance_on_multi_session_days() {
        let schedules = vec![
            (day(6), ScheduleStatus::Completed),
            (day(6), ScheduleStatus::Completed),
            (day(6), ScheduleStatus::Cancelled),
        ];
        let scans = BTreeMap::from([(day(6), 1)]);
        let cal = build_calendar(&schedules, &scans, day(18));
        assert_eq!(cal.len(), 1);
        assert_eq!(cal[0].status, AttendanceStatus::Present);
        assert_eq!((cal[0].sessions, cal[0].present), (2, 1));
    }

    #[test]
    fn mixes_statuses_across_the_month() {
        let schedules = vec![
            (day(10), ScheduleStatus::Published),
            (day(12), ScheduleStatus::Cancelled),
            (day(18), ScheduleStatus::Published),
            (day(25), ScheduleStatus::Published),
        ];
        let cal = build_calendar(&schedules, &BTreeMap::new(), day(18));
        let statuses: Vec<_> = cal.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                AttendanceStatus::Absent,
                AttendanceStatus::Cancelled,
                AttendanceStatus::OnGoing,
                AttendanceStatus::Scheduled,
            ]
        );
        assert_eq!(cal[1].sessions, 0);
    }

    #[test]
    fn best_status_of_the_day_is_shown() {
        let schedules = vec![
            (day(18), ScheduleStatus::Cancelled),
            (day(18), ScheduleStatus::Published),
        ];
        let cal = build_calendar(&schedules, &BTreeMap::new(), day(18));
        assert_eq!(cal[0].status, AttendanceStatus::OnGoing);
        assert_eq!(cal[0].sessions, 1);
    }

    #[test]
    fn scans_without_schedule_still_show() {
        let scans = BTreeMap::from([(day(3), 2)]);
        let cal = build_calendar(&[], &scans, day(18));
        assert_eq!(cal[0].status, AttendanceStatus::Present);
        assert_eq!((cal[0].sessions, cal[0].present), (0, 2));
    }
}
