use crate::api::{
    Created,
    attendance::{AttendanceCalendar, HistoryEntry, ScanRequest, ScanResult},
    class_sessions::{CreateClassSession, UpdateClassSession},
    coaches::{CreateCoach, UpdateCoach},
    courses::{CreateCourse, UpdateCourse},
    employee_attendance::{EmployeeScanRequest, EmployeeScanResult},
    employee_sessions::{CreateEmployeeSession, UpdateEmployeeSession},
    enrolments::{CreateEnrolment, EnrolmentStatusUpdate, UpdateEnrolment},
    expenses::{CreateExpense, UpdateExpense},
    gallery::UpdateCaption,
    members::{CreateMember, UpdateMember},
    payments::{CreatePayment, UpdatePayment},
    schedules::{CreateSchedule, ScheduleStatusUpdate, UpdateSchedule},
    users::{CreateUser, UpdateUser},
};
use crate::model::{
    attendance::{AttendanceEvent, EmployeeAttendance},
    class_session::ClassSession,
    coach::Coach,
    course::{Course, CourseLevel},
    employee_session::EmployeeSession,
    enrolment::{Enrolment, EnrolmentStatus},
    expense::{Expense, ExpenseCategory},
    gallery::GalleryImage,
    member::{Gender, Member, MemberStatus},
    payment::{Payment, PaymentMethod, PaymentStatus},
    role::Capability,
    schedule::{Schedule, ScheduleStatus},
    site_setting::{ImageSlot, SiteContent, SiteContentPatch},
    user::User,
};
use crate::models::{LoginReqDto, TokenPair};
use crate::service::{
    attendance_rules::AttendanceStatus,
    calendar::CalendarDay,
    employee_rules::EmployeeStatus,
    finance::{DateWindow, FinanceReport, GroupShare, MonthRow, Section},
};
use crate::utils::db_utils::{
    AttendancePage, ClassSessionPage, CoachPage, CoursePage, EmployeeAttendancePage, EmployeeSessionPage,
    EnrolmentPage, ExpensePage, GalleryPage, MemberPage, PaymentPage, SchedulePage, UserPage,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Swim School Admin API",
        version = "1.0.0",
        description = r#"
## Swim School Administration

Back office for a swim school: people, classes, attendance, money and the public site.

### Key Features
- **People**: users, members and coaches, each with a personal QR code
- **Classes**: courses, class sessions, dated schedules and enrolments
- **Attendance**: QR scans, per-day calendar and classified history
- **Staff check-in**: shifts with late and alpha thresholds
- **Finance**: payments, expenses and period-over-period reports with CSV export
- **Site content**: editable texts, hero and history images, gallery

### Security
Everything except login, public site content and the gallery listing needs a
**JWT Bearer** access token. What a caller may do is decided by its
capability: admin, operator, coach or member. Members only ever see their
own records.

### Response Format
- JSON bodies, `422` with per-field messages on validation failure
- Lists are paginated with `page` and `per_page` (1 to 100)
"#,
    ),
    paths(
        crate::api::health::healthz,

        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::regenerate_qr_code,
        crate::api::users::delete_user,

        crate::api::members::list_members,
        crate::api::members::get_member,
        crate::api::members::create_member,
        crate::api::members::update_member,
        crate::api::members::delete_member,

        crate::api::coaches::list_coaches,
        crate::api::coaches::get_coach,
        crate::api::coaches::create_coach,
        crate::api::coaches::update_coach,
        crate::api::coaches::upload_coach_photo,
        crate::api::coaches::delete_coach,

        crate::api::courses::list_courses,
        crate::api::courses::get_course,
        crate::api::courses::create_course,
        crate::api::courses::update_course,
        crate::api::courses::delete_course,

        crate::api::class_sessions::list_class_sessions,
        crate::api::class_sessions::get_class_session,
        crate::api::class_sessions::create_class_session,
        crate::api::class_sessions::update_class_session,
        crate::api::class_sessions::delete_class_session,

        crate::api::schedules::list_schedules,
        crate::api::schedules::get_schedule,
        crate::api::schedules::create_schedule,
        crate::api::schedules::update_schedule,
        crate::api::schedules::update_schedule_status,
        crate::api::schedules::delete_schedule,

        crate::api::enrolments::list_enrolments,
        crate::api::enrolments::get_enrolment,
        crate::api::enrolments::create_enrolment,
        crate::api::enrolments::update_enrolment,
        crate::api::enrolments::update_enrolment_status,
        crate::api::enrolments::delete_enrolment,

        crate::api::payments::list_payments,
        crate::api::payments::get_payment,
        crate::api::payments::create_payment,
        crate::api::payments::update_payment,
        crate::api::payments::delete_payment,

        crate::api::expenses::list_expenses,
        crate::api::expenses::get_expense,
        crate::api::expenses::create_expense,
        crate::api::expenses::update_expense,
        crate::api::expenses::delete_expense,

        crate::api::attendance::scan,
        crate::api::attendance::calendar,
        crate::api::attendance::history,
        crate::api::attendance::list_attendance,
        crate::api::attendance::delete_attendance,

        crate::api::employee_sessions::list_employee_sessions,
        crate::api::employee_sessions::get_employee_session,
        crate::api::employee_sessions::create_employee_session,
        crate::api::employee_sessions::update_employee_session,
        crate::api::employee_sessions::delete_employee_session,

        crate::api::employee_attendance::scan_employee,
        crate::api::employee_attendance::list_employee_attendance,

        crate::api::content::show_content,
        crate::api::content::update_content,
        crate::api::content::update_content_image,
        crate::api::content::delete_content_image,

        crate::api::gallery::list_gallery,
        crate::api::gallery::get_gallery_image,
        crate::api::gallery::upload_gallery_image,
        crate::api::gallery::update_gallery_image,
        crate::api::gallery::delete_gallery_image,

        crate::api::reports::finance,
        crate::api::reports::finance_export,
        crate::api::reports::members_export
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Created,
            Capability,

            User,
            UserPage,
            CreateUser,
            UpdateUser,
            Member,
            MemberPage,
            MemberStatus,
            Gender,
            CreateMember,
            UpdateMember,
            Coach,
            CoachPage,
            CreateCoach,
            UpdateCoach,

            Course,
            CoursePage,
            CourseLevel,
            CreateCourse,
            UpdateCourse,
            ClassSession,
            ClassSessionPage,
            CreateClassSession,
            UpdateClassSession,
            Schedule,
            SchedulePage,
            ScheduleStatus,
            CreateSchedule,
            UpdateSchedule,
            ScheduleStatusUpdate,
            Enrolment,
            EnrolmentPage,
            EnrolmentStatus,
            CreateEnrolment,
            UpdateEnrolment,
            EnrolmentStatusUpdate,

            Payment,
            PaymentPage,
            PaymentMethod,
            PaymentStatus,
            CreatePayment,
            UpdatePayment,
            Expense,
            ExpensePage,
            ExpenseCategory,
            CreateExpense,
            UpdateExpense,

            AttendanceEvent,
            AttendancePage,
            AttendanceStatus,
            ScanRequest,
            ScanResult,
            CalendarDay,
            AttendanceCalendar,
            HistoryEntry,
            EmployeeSession,
            EmployeeSessionPage,
            CreateEmployeeSession,
            UpdateEmployeeSession,
            EmployeeAttendance,
            EmployeeAttendancePage,
            EmployeeStatus,
            EmployeeScanRequest,
            EmployeeScanResult,

            SiteContent,
            SiteContentPatch,
            ImageSlot,
            GalleryImage,
            GalleryPage,
            UpdateCaption,

            DateWindow,
            GroupShare,
            Section,
            MonthRow,
            FinanceReport
        )
    ),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Users", description = "Accounts and QR codes"),
        (name = "Members", description = "Swimmers and their profiles"),
        (name = "Coaches", description = "Coaches and their photos"),
        (name = "Courses", description = "Course catalogue"),
        (name = "Class sessions", description = "Recurring classes of a course"),
        (name = "Schedules", description = "Dated occurrences of a class"),
        (name = "Enrolments", description = "Members enrolled in courses"),
        (name = "Payments", description = "Income from enrolments"),
        (name = "Expenses", description = "Running costs"),
        (name = "Attendance", description = "QR scans, calendar and history"),
        (name = "Employee attendance", description = "Staff shifts and check-ins"),
        (name = "Content", description = "Public site content and gallery"),
        (name = "Reports", description = "Finance report and CSV exports"),
        (name = "Operational", description = "Liveness"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_documented_route_lives_under_the_api_prefix() {
        let doc = ApiDoc::openapi();
        for path in doc.paths.paths.keys() {
            assert!(
                path.starts_with("/api/v1/") || path == "/healthz",
                "unexpected path {path}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
