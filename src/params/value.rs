//! Typed parameter values
//!
//! Every value processor produces one of these variants. The variant records
//! which kind of rule accepted the raw string, so downstream stages can tell a
//! pixel width (`Integer`) from a fraction of the source width (`UnitScalar`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A processed (validated and coerced) parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Opaque text (also used for colours, URLs, paths and fonts)
    String(String),
    /// Comma separated list, order preserved
    List(Vec<String>),
    Boolean(bool),
    Integer(i64),
    Number(f64),
    /// A fraction in the unit interval, relative to some source quantity
    UnitScalar(f64),
    Timestamp(DateTime<Utc>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of any numeric variant
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(n) => Some(*n as f64),
            ParamValue::Number(n) | ParamValue::UnitScalar(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this value satisfies a `key=value` dependency entry.
    ///
    /// Lists match when they contain the expected item; every other variant
    /// matches when its canonical rendering equals the expected text exactly.
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            ParamValue::List(items) => items.iter().any(|item| item == expected),
            other => other.to_string() == expected,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{}", s),
            ParamValue::List(items) => write!(f, "{}", items.join(",")),
            ParamValue::Boolean(b) => write!(f, "{}", b),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Number(n) | ParamValue::UnitScalar(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            ParamValue::Timestamp(ts) => write!(f, "{}", ts.timestamp()),
        }
    }
}

/// A literal as it appears in the schema asset (defaults, possible values)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Literal {
    /// Defaults are taken as already-processed values
    pub fn to_value(&self) -> ParamValue {
        match self {
            Literal::Bool(b) => ParamValue::Boolean(*b),
            Literal::Integer(n) => ParamValue::Integer(*n),
            Literal::Number(n) => ParamValue::Number(*n),
            Literal::Text(s) => ParamValue::String(s.clone()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(s) => Some(s),
            _ => None,
        }
    }
}
