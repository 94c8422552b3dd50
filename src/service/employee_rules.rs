//! Scan-time grading of staff check-ins against a session's thresholds.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    Present,
    Late,
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionThresholds {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub late_threshold: NaiveTime,
    pub alpha_threshold: Option<NaiveTime>,
}

impl SessionThresholds {
    /// Field name and message for every ordering the session violates.
    pub fn problems(&self) -> Vec<(&'static str, &'static str)> {
        let mut out = Vec::new();
        if self.start >= self.end {
            out.push(("end_time", "The end time must be after the start time."));
        }
        if self.late_threshold < self.start || self.late_threshold > self.end {
            out.push((
                "late_threshold",
                "The late threshold must fall between the start and end time.",
            ));
        }
        if let Some(alpha) = self.alpha_threshold {
            if alpha <= self.late_threshold {
                out.push((
                    "alpha_threshold",
                    "The alpha threshold must be after the late threshold.",
                ));
            }
        }
        out
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Both boundaries are inclusive on the early side: a scan exactly on a
    /// threshold gets the better grade.
    pub fn classify(&self, scanned: NaiveTime) -> EmployeeStatus {
        if scanned <= self.late_threshold {
            return EmployeeStatus::Present;
        }
        match self.alpha_threshold {
            Some(alpha) if scanned > alpha => EmployeeStatus::Alpha,
            _ => EmployeeStatus::Late,
        }
    }
}

/// Picks the first session whose window contains the scan time.
pub fn session_for_time<'a, T, F>(sessions: &'a [T], time: NaiveTime, thresholds: F) -> Option<&'a T>
where
    F: Fn(&T) -> SessionThresholds,
{
    sessions.iter().find(|s| thresholds(s).contains(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn morning(alpha: Option<NaiveTime>) -> SessionThresholds {
        SessionThresholds {
            start: t(6, 0, 0),
            end: t(12, 0, 0),
            late_threshold: t(6, 15, 0),
            alpha_threshold: alpha,
        }
    }

    #[test_case(t(5, 50, 0) => EmployeeStatus::Present; "before start")]
    #[test_case(t(6, 15, 0) => EmployeeStatus::Present; "exactly at late threshold")]
    #[test_case(t(6, 15, 1) => EmployeeStatus::Late; "one second after late threshold")]
    #[test_case(t(7, 0, 0) => EmployeeStatus::Late; "exactly at alpha threshold")]
    #[test_case(t(7, 0, 1) => EmployeeStatus::Alpha; "one second after alpha threshold")]
    fn with_alpha(scan: NaiveTime) -> EmployeeStatus {
        morning(Some(t(7, 0, 0))).classify(scan)
    }

    #[test]
    fn without_alpha_everything_late_is_late() {
        let session = morning(None);
        assert_eq!(session.classify(t(6, 15, 1)), EmployeeStatus::Late);
        assert_eq!(session.classify(t(11, 59, 59)), EmployeeStatus::Late);
    }

    #[test]
    fn reports_bad_orderings() {
        let bad = SessionThresholds {
            start: t(9, 0, 0),
            end: t(8, 0, 0),
            late_threshold: t(10, 0, 0),
            alpha_threshold: Some(t(9, 30, 0)),
        };
        let fields: Vec<_> = bad.problems().into_iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["end_time", "late_threshold", "alpha_threshold"]);
        assert!(morning(Some(t(7, 0, 0))).problems().is_empty());
    }

    #[test]
    fn finds_the_open_session() {
        let sessions = vec![
            morning(None),
            SessionThresholds {
                start: t(13, 0, 0),
                end: t(18, 0, 0),
                late_threshold: t(13, 10, 0),
                alpha_threshold: None,
            },
        ];
        let found = session_for_time(&sessions, t(13, 5, 0), |s| *s);
        assert_eq!(found.map(|s| s.start), Some(t(13, 0, 0)));
        assert!(session_for_time(&sessions, t(12, 30, 0), |s| *s).is_none());
    }
}
