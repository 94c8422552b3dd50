//! Read-time attendance status for members and coaches.
//!
//! The status is never stored. It is derived from the schedule's date and
//! lifecycle status plus the set of dates on which the subject scanned in.
//! Rules are evaluated top to bottom and the first match wins.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::model::schedule::ScheduleStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    OnGoing,
    Scheduled,
    Absent,
    Cancelled,
}

/// Everything the rules look at for one schedule.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleFacts<'a> {
    pub date: NaiveDate,
    pub status: ScheduleStatus,
    /// Scan dates of the subject, already converted to the business timezone.
    pub attended_dates: &'a BTreeSet<NaiveDate>,
    pub today: NaiveDate,
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&ScheduleFacts<'_>) -> bool,
    pub status: AttendanceStatus,
}

fn scanned_on_schedule_date(f: &ScheduleFacts<'_>) -> bool {
    f.attended_dates.contains(&f.date)
}

fn is_cancelled(f: &ScheduleFacts<'_>) -> bool {
    f.status == ScheduleStatus::Cancelled
}

fn is_completed(f: &ScheduleFacts<'_>) -> bool {
    f.status == ScheduleStatus::Completed
}

fn is_running(f: &ScheduleFacts<'_>) -> bool {
    f.status == ScheduleStatus::OnGoing || f.date == f.today
}

fn is_past(f: &ScheduleFacts<'_>) -> bool {
    f.date < f.today
}

/// Precedence table. A scan on the date beats every other signal.
pub const RULES: [Rule; 5] = [
    Rule {
        name: "scanned_on_date",
        applies: scanned_on_schedule_date,
        status: AttendanceStatus::Present,
    },
    Rule {
        name: "schedule_cancelled",
        applies: is_cancelled,
        status: AttendanceStatus::Cancelled,
    },
    Rule {
        name: "schedule_completed",
        applies: is_completed,
        status: AttendanceStatus::Absent,
    },
    Rule {
        name: "schedule_running",
        applies: is_running,
        status: AttendanceStatus::OnGoing,
    },
    Rule {
        name: "date_passed",
        applies: is_past,
        status: AttendanceStatus::Absent,
    },
];

/// Status when no rule matches.
pub const FALLBACK: AttendanceStatus = AttendanceStatus::Scheduled;

/// Returns the status and the name of the rule that produced it.
pub fn classify_with_rule(facts: &ScheduleFacts<'_>) -> (AttendanceStatus, &'static str) {
    RULES
        .iter()
        .find(|rule| (rule.applies)(facts))
        .map(|rule| (rule.status, rule.name))
        .unwrap_or((FALLBACK, "fallback"))
}

pub fn classify(facts: &ScheduleFacts<'_>) -> AttendanceStatus {
    classify_with_rule(facts).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    const TODAY: u32 = 18;

    fn run(date: u32, status: ScheduleStatus, scans: &[u32]) -> AttendanceStatus {
        let attended: BTreeSet<NaiveDate> = scans.iter().map(|d| day(*d)).collect();
        classify(&ScheduleFacts {
            date: day(date),
            status,
            attended_dates: &attended,
            today: day(TODAY),
        })
    }

    #[test_case(17, ScheduleStatus::Published, &[] => AttendanceStatus::Absent; "yesterday without scan")]
    #[test_case(18, ScheduleStatus::Published, &[] => AttendanceStatus::OnGoing; "today without scan")]
    #[test_case(18, ScheduleStatus::Published, &[18] => AttendanceStatus::Present; "today with scan")]
    #[test_case(20, ScheduleStatus::OnGoing, &[] => AttendanceStatus::OnGoing; "future but marked on going")]
    #[test_case(20, ScheduleStatus::Completed, &[] => AttendanceStatus::Absent; "completed without scan")]
    #[test_case(10, ScheduleStatus::Cancelled, &[] => AttendanceStatus::Cancelled; "past cancelled")]
    #[test_case(18, ScheduleStatus::Cancelled, &[] => AttendanceStatus::Cancelled; "cancelled beats today")]
    #[test_case(25, ScheduleStatus::Published, &[] => AttendanceStatus::Scheduled; "future published")]
    #[test_case(25, ScheduleStatus::Published, &[24, 26] => AttendanceStatus::Scheduled; "scans on other days do not count")]
    fn decision_table(date: u32, status: ScheduleStatus, scans: &[u32]) -> AttendanceStatus {
        run(date, status, scans)
    }

    #[test]
    fn scan_on_date_wins_over_every_status() {
        for status in ScheduleStatus::iter() {
            for date in [10, TODAY, 25] {
                assert_eq!(run(date, status, &[date]), AttendanceStatus::Present);
            }
        }
    }

    #[test]
    fn cancelled_without_scan_is_always_cancelled() {
        for date in 1..=31 {
            assert_eq!(run(date, ScheduleStatus::Cancelled, &[]), AttendanceStatus::Cancelled);
        }
    }

    #[test]
    fn future_published_without_scan_is_always_scheduled() {
        for date in (TODAY + 1)..=31 {
            assert_eq!(run(date, ScheduleStatus::Published, &[]), AttendanceStatus::Scheduled);
        }
    }

    #[test]
    fn reports_the_matching_rule() {
        let attended = BTreeSet::new();
        let facts = ScheduleFacts {
            date: day(1),
            status: ScheduleStatus::Published,
            attended_dates: &attended,
            today: day(TODAY),
        };
        assert_eq!(classify_with_rule(&facts), (AttendanceStatus::Absent, "date_passed"));
    }
}
