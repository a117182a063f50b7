//! # Dependency Transforms
//!
//! The closed registry of named functions a `DependencySpec` may apply to
//! an anchor field before copying it into a child record. Names are
//! resolved here at profile-load time; an unknown name is a configuration
//! error, never a generation-time surprise.

use crate::generate::value::Value;

/// A statically defined pure transform over one anchor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Uppercase,
    Lowercase,
    Trim,
    /// Extract the leading four-digit year from a date-like string.
    Year,
    /// Add one to an integer or float value.
    Increment,
}

/// Names accepted on the wire, in registry order.
pub const KNOWN_TRANSFORMS: &[&str] = &["uppercase", "lowercase", "trim", "year", "increment"];

impl Transform {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uppercase" => Some(Transform::Uppercase),
            "lowercase" => Some(Transform::Lowercase),
            "trim" => Some(Transform::Trim),
            "year" => Some(Transform::Year),
            "increment" => Some(Transform::Increment),
            _ => None,
        }
    }

    /// Apply the transform. Values the transform does not speak to pass
    /// through unchanged rather than failing the record.
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Transform::Uppercase, Value::String(s)) => Value::String(s.to_uppercase()),
            (Transform::Lowercase, Value::String(s)) => Value::String(s.to_lowercase()),
            (Transform::Trim, Value::String(s)) => Value::String(s.trim().to_string()),
            (Transform::Year, Value::String(s)) => match leading_year(s) {
                Some(y) => Value::Int(y),
                None => value.clone(),
            },
            (Transform::Increment, Value::Int(i)) => Value::Int(i + 1),
            (Transform::Increment, Value::Float(f)) => Value::Float(f + 1.0),
            _ => value.clone(),
        }
    }
}

/// First run of exactly four digits in `s`, parsed as a year.
fn leading_year(s: &str) -> Option<i64> {
    let digits: String = s.chars().skip_while(|c| !c.is_ascii_digit()).collect();
    let run: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    if run.len() >= 4 {
        run[..4].parse().ok()
    } else {
        None
    }
}
