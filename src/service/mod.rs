pub mod attendance_rules;
pub mod calendar;
pub mod csv_export;
pub mod employee_rules;
pub mod finance;
