//! One table decides what each capability may do. Handlers name the area
//! and action they touch; nothing else checks roles.

use strum_macros::{AsRefStr, Display, EnumIter};

use crate::model::role::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Area {
    Users,
    Members,
    Coaches,
    Courses,
    ClassSessions,
    Schedules,
    Enrolments,
    Payments,
    Expenses,
    Attendance,
    AttendanceScan,
    EmployeeSessions,
    EmployeeAttendance,
    Content,
    Reports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Read,
    Write,
}

/// What a capability may do in an area. Members only ever reach their own
/// records; the handlers apply that scoping on top of this table.
pub fn permits(capability: Capability, area: Area, action: Action) -> bool {
    use Action::*;
    use Area::*;
    use Capability::*;

    match (capability, area, action) {
        (Admin, _, _) => true,

        (Operator, Users | Expenses | Content | EmployeeSessions | Attendance, Write) => false,
        (Operator, Users | Expenses, Read) => false,
        (Operator, Reports, _) => false,
        (Operator, Courses | Coaches | ClassSessions | Schedules, Write) => false,
        (Operator, _, _) => true,

        (Coach, Schedules | ClassSessions | Courses | Members | Coaches, Read) => true,
        (Coach, Attendance, Read) => true,
        (Coach, AttendanceScan | EmployeeAttendance, Write) => true,
        (Coach, EmployeeAttendance, Read) => true,
        (Coach, _, _) => false,

        (Member, Courses | Schedules | ClassSessions | Coaches, Read) => true,
        (Member, Enrolments | Payments | Attendance, Read) => true,
        (Member, _, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    #[test]
    fn admin_may_do_everything() {
        for area in Area::iter() {
            for action in Action::iter() {
                assert!(permits(Capability::Admin, area, action), "{area} {action}");
            }
        }
    }

    #[test]
    fn members_never_write() {
        for area in Area::iter() {
            assert!(!permits(Capability::Member, area, Action::Write), "{area}");
        }
    }

    #[test_case(Capability::Operator, Area::Members, Action::Write => true; "operator registers members")]
    #[test_case(Capability::Operator, Area::Payments, Action::Write => true; "operator records payments")]
    #[test_case(Capability::Operator, Area::AttendanceScan, Action::Write => true; "operator runs the scanner")]
    #[test_case(Capability::Operator, Area::Reports, Action::Read => false; "operator cannot see reports")]
    #[test_case(Capability::Operator, Area::Content, Action::Write => false; "operator cannot edit content")]
    #[test_case(Capability::Operator, Area::Schedules, Action::Read => true; "operator reads schedules")]
    #[test_case(Capability::Operator, Area::Attendance, Action::Write => false; "only admins delete scans")]
    #[test_case(Capability::Operator, Area::Schedules, Action::Write => false; "operator cannot plan schedules")]
    #[test_case(Capability::Coach, Area::AttendanceScan, Action::Write => true; "coach scans members")]
    #[test_case(Capability::Coach, Area::Payments, Action::Read => false; "coach cannot see payments")]
    #[test_case(Capability::Coach, Area::Coaches, Action::Write => false; "coach cannot edit coaches")]
    #[test_case(Capability::Member, Area::Attendance, Action::Read => true; "member sees own attendance")]
    #[test_case(Capability::Member, Area::Members, Action::Read => false; "member cannot list members")]
    #[test_case(Capability::Member, Area::Reports, Action::Read => false; "member cannot see reports")]
    fn policy(capability: Capability, area: Area, action: Action) -> bool {
        permits(capability, area, action)
    }
}
