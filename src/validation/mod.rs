//! Request payload validation.
//!
//! Every schema is split into a structural stage (`check_*`), which reads an
//! untyped JSON value and collects every violated field, and an optional pure
//! normalization stage that turns the checked value into what handlers use.

pub mod auth;
pub mod catalog;
pub mod transaction;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

pub use auth::{LoginInput, PasswordChange, ProfileUpdate, RegisterInput, Registration, RoleUpdate};
pub use catalog::{CategoryInput, EventInput, TicketDetails, TicketInput};
pub use transaction::{StatusUpdate, TransactionInput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Error)]
#[error("{} field(s) failed validation", .issues.len())]
pub struct ValidationErrors {
    issues: Vec<Issue>,
}

impl ValidationErrors {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue::new(path, message)],
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// First message reported for `path`, if any.
    pub fn message_for(&self, path: &str) -> Option<&str> {
        self.issues
            .iter()
            .find(|issue| issue.path == path)
            .map(|issue| issue.message.as_str())
    }
}

impl From<Vec<Issue>> for ValidationErrors {
    fn from(issues: Vec<Issue>) -> Self {
        Self { issues }
    }
}

/// Inclusive length bounds counted in characters.
#[derive(Debug, Clone, Copy)]
pub struct Len(pub usize, pub usize);

/// Inclusive integer bounds.
#[derive(Debug, Clone, Copy)]
pub struct Range(pub i64, pub i64);

pub(crate) fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Collects issues while reading fields out of a JSON object.
#[derive(Debug, Default)]
pub struct Checker {
    issues: Vec<Issue>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue::new(path, message));
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `value` only if nothing was reported.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, ValidationErrors> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => {
                let mut issues = self.issues;
                if issues.is_empty() {
                    issues.push(Issue::new("", "Invalid input"));
                }
                Err(ValidationErrors { issues })
            }
        }
    }

    pub fn root<'v>(&mut self, value: &'v Value) -> Option<&'v Map<String, Value>> {
        self.expect_object(value, "")
    }

    fn expect_object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.issue(path, format!("Expected object, received {}", type_name(other)));
                None
            }
        }
    }

    /// Nested object; `None` without an issue when absent.
    pub fn optional_object<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v Map<String, Value>> {
        match present(obj, key) {
            None => None,
            Some(value) => self.expect_object(value, path),
        }
    }

    pub fn array<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        path: &str,
        min_items: usize,
    ) -> Option<&'v Vec<Value>> {
        match present(obj, key) {
            None => {
                self.issue(path, "Required");
                None
            }
            Some(Value::Array(items)) => {
                if items.len() < min_items {
                    self.issue(
                        path,
                        format!("Array must contain at least {} element(s)", min_items),
                    );
                }
                Some(items)
            }
            Some(other) => {
                self.issue(path, format!("Expected array, received {}", type_name(other)));
                None
            }
        }
    }

    pub fn string(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
        len: Len,
    ) -> Option<String> {
        match present(obj, key) {
            None => {
                self.issue(path, "Required");
                None
            }
            Some(value) => self.string_value(value, path, len),
        }
    }

    pub fn optional_string(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
        len: Len,
    ) -> Option<String> {
        present(obj, key).and_then(|value| self.string_value(value, path, len))
    }

    fn string_value(&mut self, value: &Value, path: &str, Len(min, max): Len) -> Option<String> {
        let Value::String(s) = value else {
            self.issue(path, format!("Expected string, received {}", type_name(value)));
            return None;
        };
        let count = s.chars().count();
        if count < min {
            self.issue(path, format!("String must contain at least {} character(s)", min));
            None
        } else if count > max {
            self.issue(path, format!("String must contain at most {} character(s)", max));
            None
        } else {
            Some(s.clone())
        }
    }

    /// Integer field accepting JSON numbers and numeric strings.
    pub fn number(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
        range: Range,
    ) -> Option<i64> {
        match present(obj, key) {
            None => {
                self.issue(path, "Required");
                None
            }
            Some(value) => self.number_value(value, path, range),
        }
    }

    pub fn number_value(&mut self, value: &Value, path: &str, Range(min, max): Range) -> Option<i64> {
        let number = match exact_integer(value) {
            Some(number) => number,
            None => {
                let Some(number) = coerce_number(value) else {
                    self.issue(path, format!("Expected number, received {}", type_name(value)));
                    return None;
                };
                if number.fract() != 0.0 {
                    self.issue(path, "Expected integer, received float");
                    return None;
                }
                // Integral but outside i64: report against the nearer bound
                if number >= I64_LIMIT {
                    self.issue(path, format!("Number must be less than or equal to {}", max));
                    return None;
                }
                if number < -I64_LIMIT {
                    self.issue(path, format!("Number must be greater than or equal to {}", min));
                    return None;
                }
                number as i64
            }
        };
        if number < min {
            self.issue(path, format!("Number must be greater than or equal to {}", min));
            None
        } else if number > max {
            self.issue(path, format!("Number must be less than or equal to {}", max));
            None
        } else {
            Some(number)
        }
    }

    /// Enumerated string field; `default` applies when the key is absent.
    pub fn one_of<T>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
        allowed: &[T],
        default: Option<T>,
    ) -> Option<T>
    where
        T: FromStr + Copy + PartialEq + std::fmt::Display,
    {
        let value = match (present(obj, key), default) {
            (None, Some(default)) => return Some(default),
            (None, None) => {
                self.issue(path, "Required");
                return None;
            }
            (Some(value), _) => value,
        };
        let expected = allowed
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(" | ");
        match value.as_str().and_then(|s| s.parse::<T>().ok()) {
            Some(parsed) if allowed.contains(&parsed) => Some(parsed),
            _ => {
                self.issue(
                    path,
                    format!("Invalid enum value. Expected {}, received {}", expected, value),
                );
                None
            }
        }
    }
}

/// Absent keys and explicit nulls both count as missing.
fn present<'v>(obj: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    obj.get(key).filter(|value| !value.is_null())
}

/// 2^63, the first magnitude an `i64` cannot hold.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Integers that fit an `i64` without going through `f64`.
fn exact_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Numeric coercion: JSON numbers pass through, strings are trimmed and
/// parsed. Blank or non-numeric strings are rejected.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_'+\-]+(\.[A-Za-z0-9_'+\-]+)*@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(r"^([+]?[\s0-9]+)?(\d{3}|[(]?[0-9]+[)])?([-]?[\s]?[0-9])+$")
            .expect("phone pattern compiles")
    })
}

pub fn is_email(candidate: &str) -> bool {
    email_regex().is_match(candidate)
}

pub fn is_phone_number(candidate: &str) -> bool {
    phone_regex().is_match(candidate)
}

/// National id numbers are exactly 16 digits without a leading zero.
pub fn is_id_number(candidate: &str) -> bool {
    candidate.len() == 16
        && candidate.bytes().all(|b| b.is_ascii_digit())
        && !candidate.starts_with('0')
}

impl Checker {
    pub fn email(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<String> {
        let raw = self.string(obj, key, path, Len(1, 255))?;
        let email = raw.trim().to_lowercase();
        if is_email(&email) {
            Some(email)
        } else {
            self.issue(path, "Invalid email");
            None
        }
    }

    pub fn phone_number(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<String> {
        let raw = self.optional_string(obj, key, path, Len(1, 32))?;
        if is_phone_number(&raw) {
            Some(raw)
        } else {
            self.issue(path, "Invalid phone number");
            None
        }
    }

    /// 16-digit id given either as a string or as a JSON integer.
    pub fn id_number(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<String> {
        let raw = match present(obj, key) {
            None => {
                self.issue(path, "Required");
                return None;
            }
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) if n.is_u64() => n.to_string(),
            Some(other) => {
                self.issue(path, format!("Expected number, received {}", type_name(other)));
                return None;
            }
        };
        if is_id_number(&raw) {
            Some(raw)
        } else {
            self.issue(path, "ID number must be exactly 16 digits");
            None
        }
    }

    pub fn record_id<T: FromStr>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<T> {
        let raw = self.string(obj, key, path, Len(24, 24))?;
        match raw.parse::<T>() {
            Ok(id) => Some(id),
            Err(_) => {
                self.issue(path, "Invalid identifier");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TransactionStatus;
    use serde_json::json;

    fn obj(value: &Value) -> &Map<String, Value> {
        value.as_object().unwrap()
    }

    #[test]
    fn test_string_bounds_report_path() {
        let input = json!({ "name": "abc" });
        let mut checker = Checker::new();
        assert_eq!(checker.string(obj(&input), "name", "name", Len(4, 255)), None);
        let errors = checker.finish::<()>(None).unwrap_err();
        assert_eq!(
            errors.message_for("name"),
            Some("String must contain at least 4 character(s)")
        );
    }

    #[test]
    fn test_null_counts_as_missing() {
        let input = json!({ "name": null });
        let mut checker = Checker::new();
        assert_eq!(checker.optional_string(obj(&input), "name", "name", Len(1, 5)), None);
        assert!(checker.is_clean());
        checker.string(obj(&input), "name", "name", Len(1, 5));
        assert!(!checker.is_clean());
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(coerce_number(&json!("3")), Some(3.0));
        assert_eq!(coerce_number(&json!(" 4 ")), Some(4.0));
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!("four")), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_number_rejects_fractions_and_bounds() {
        let mut checker = Checker::new();
        assert_eq!(checker.number_value(&json!("1.5"), "q", Range(1, 4)), None);
        assert_eq!(checker.number_value(&json!(5), "q", Range(1, 4)), None);
        assert_eq!(checker.number_value(&json!("2"), "q", Range(1, 4)), Some(2));
        assert_eq!(checker.issues.len(), 2);
    }

    #[test]
    fn test_number_past_i64_is_rejected_not_saturated() {
        let mut checker = Checker::new();
        let full = Range(0, i64::MAX);
        assert_eq!(
            checker.number_value(&json!("9223372036854775807"), "price", full),
            Some(i64::MAX)
        );
        assert!(checker.is_clean());

        assert_eq!(checker.number_value(&json!("9223372036854775808"), "price", full), None);
        assert_eq!(checker.number_value(&json!(u64::MAX), "stock", full), None);
        assert_eq!(checker.number_value(&json!("-1e30"), "stock", full), None);
        assert_eq!(checker.issues.len(), 3);
        assert_eq!(
            checker.issues[0].message,
            format!("Number must be less than or equal to {}", i64::MAX)
        );

        // Integral floats still pass
        assert_eq!(checker.number_value(&json!("5.0"), "q", Range(1, 10)), Some(5));
    }

    #[test]
    fn test_one_of_default_and_rejection() {
        let allowed = [TransactionStatus::Pending, TransactionStatus::Paid];
        let mut checker = Checker::new();
        let empty = json!({});
        assert_eq!(
            checker.one_of(obj(&empty), "status", "status", &allowed, Some(TransactionStatus::Pending)),
            Some(TransactionStatus::Pending)
        );
        let expired = json!({ "status": "expired" });
        assert_eq!(
            checker.one_of(obj(&expired), "status", "status", &allowed, Some(TransactionStatus::Pending)),
            None
        );
        let errors = checker.finish::<()>(None).unwrap_err();
        assert!(errors.message_for("status").unwrap().starts_with("Invalid enum value"));
    }

    #[test]
    fn test_patterns() {
        assert!(is_email("a@b.com"));
        assert!(is_email("first.last+tag@mail.example.co.id"));
        assert!(!is_email("a@b"));
        assert!(!is_email("not an email"));

        assert!(is_phone_number("+62 812-3456-7890"));
        assert!(is_phone_number("081234567890"));
        assert!(!is_phone_number("call me"));

        assert!(is_id_number("3174012345678901"));
        assert!(!is_id_number("0174012345678901"));
        assert!(!is_id_number("317401234567890"));
        assert!(!is_id_number("31740123456789012"));
    }

    #[test]
    fn test_finish_without_value_still_errors() {
        let checker = Checker::new();
        let errors = checker.finish::<()>(None).unwrap_err();
        assert_eq!(errors.issues().len(), 1);
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join("", "email"), "email");
        assert_eq!(join("profile.address", "city"), "profile.address.city");
    }
}
