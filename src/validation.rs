use chrono::{Datelike, NaiveDate};

use crate::error::{ApiError, FieldErrors};

/// Years a stored or queried date may fall in.
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 9999;

fn year_in_range(date: NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

/// Collects per-field messages so a form can be rejected as a whole
/// before anything is written.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.add(field, message);
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        let ok = !value.trim().is_empty();
        self.check(field, ok, format!("The {field} field is required."))
    }

    /// Only validates when the value is present; used by partial updates.
    pub fn required_if_present(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.required(field, v);
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let ok = value.chars().count() <= max;
        self.check(
            field,
            ok,
            format!("The {field} may not be greater than {max} characters."),
        )
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let ok = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.contains(char::is_whitespace)
            }
            None => false,
        };
        self.check(field, ok, format!("The {field} must be a valid email address."))
    }

    pub fn positive(&mut self, field: &str, value: f64) -> &mut Self {
        self.check(
            field,
            value.is_finite() && value > 0.0,
            format!("The {field} must be greater than 0."),
        )
    }

    pub fn non_negative(&mut self, field: &str, value: f64) -> &mut Self {
        self.check(
            field,
            value.is_finite() && value >= 0.0,
            format!("The {field} must be at least 0."),
        )
    }

    pub fn date_order(&mut self, field: &str, start: NaiveDate, end: NaiveDate) -> &mut Self {
        self.check(
            field,
            start <= end,
            format!("The {field} must be a date after or equal to the start date."),
        )
    }

    pub fn date_in_range(&mut self, field: &str, date: NaiveDate) -> &mut Self {
        self.check(
            field,
            year_in_range(date),
            format!("The {field} must be between {MIN_YEAR} and {MAX_YEAR}."),
        )
    }

    pub fn opt_date_in_range(&mut self, field: &str, date: Option<NaiveDate>) -> &mut Self {
        if let Some(date) = date {
            self.date_in_range(field, date);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Parses `YYYY-MM-DD`, reporting a field error instead of failing the request.
pub fn parse_date(v: &mut Validator, field: &str, value: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        Ok(d) if year_in_range(d) => Some(d),
        Ok(d) => {
            v.date_in_range(field, d);
            None
        }
        Err(_) => {
            v.add(field, format!("The {field} is not a valid date."));
            None
        }
    }
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(v: &mut Validator, field: &str, value: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d") {
        Ok(d) if year_in_range(d) => Some(d),
        Ok(d) => {
            v.date_in_range(field, d);
            None
        }
        Err(_) => {
            v.add(field, format!("The {field} must match the format YYYY-MM."));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_failing_field() {
        let mut v = Validator::new();
        v.required("name", "  ")
            .email("email", "not-an-email")
            .positive("amount", 0.0);
        let err = v.finish().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors["name"][0].contains("required"));
                assert!(errors.contains_key("email"));
                assert!(errors.contains_key("amount"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_input() {
        let mut v = Validator::new();
        v.required("name", "Budi")
            .email("email", "budi@example.com")
            .positive("amount", 150_000.0)
            .max_len("name", "Budi", 10);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn email_rules() {
        for bad in ["a@b", "@example.com", "a b@example.com", "a@.com", "a@com."] {
            let mut v = Validator::new();
            v.email("email", bad);
            assert!(!v.is_valid(), "{bad} should be rejected");
        }
    }

    #[test]
    fn partial_updates_skip_absent_fields() {
        let mut v = Validator::new();
        v.required_if_present("name", None);
        assert!(v.is_valid());
        v.required_if_present("name", Some(""));
        assert!(!v.is_valid());
    }

    #[test]
    fn parses_dates_and_months() {
        let mut v = Validator::new();
        assert_eq!(
            parse_date(&mut v, "date", "2026-03-09"),
            NaiveDate::from_ymd_opt(2026, 3, 9)
        );
        assert_eq!(
            parse_month(&mut v, "month", "2026-02"),
            NaiveDate::from_ymd_opt(2026, 2, 1)
        );
        assert!(v.is_valid());
        assert_eq!(parse_date(&mut v, "date", "2026-02-30"), None);
        assert_eq!(parse_month(&mut v, "month", "2026-13"), None);
        assert!(!v.is_valid());
    }

    #[test]
    fn far_out_dates_are_rejected() {
        let mut v = Validator::new();
        assert_eq!(parse_date(&mut v, "to", "+262142-12-31"), None);
        assert_eq!(parse_date(&mut v, "from", "-262000-01-01"), None);
        assert_eq!(parse_date(&mut v, "start", "1969-12-31"), None);
        assert_eq!(parse_month(&mut v, "month", "10000-01"), None);
        let err = v.finish().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors["to"][0].contains("between 1970 and 9999"));
                for field in ["from", "start", "month"] {
                    assert!(errors.contains_key(field), "missing {field}");
                }
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut v = Validator::new();
        v.opt_date_in_range("from", NaiveDate::from_ymd_opt(9999, 12, 31))
            .opt_date_in_range("to", None);
        assert!(v.is_valid());
    }
}
