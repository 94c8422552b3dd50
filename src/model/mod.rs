pub mod attendance;
pub mod class_session;
pub mod coach;
pub mod course;
pub mod employee_session;
pub mod enrolment;
pub mod expense;
pub mod gallery;
pub mod member;
pub mod payment;
pub mod role;
pub mod schedule;
pub mod site_setting;
pub mod user;
