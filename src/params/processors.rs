//! Value processors
//!
//! Pure functions that validate a single raw query-string value against one
//! rule and coerce it into a [`ParamValue`]. Each returns the coerced value or
//! a [`Rejection`] naming why the value does not fit the rule.
//!
//! Range policies differ on purpose: `integer` and `unit_scalar` reject values
//! outside `strict_range`, while `number` clamps them into range.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::{RuleType, Schema, StrictRange, ValueRule};
use super::value::{Literal, ParamValue};

static RATIO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?):(\d+(?:\.\d+)?)$").expect("ratio pattern compiles")
});

static HEX_COLOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("hex colour pattern compiles")
});

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+$").expect("url pattern compiles"));

/// Why a raw value failed a rule
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("a non-empty value is required")]
    Empty,

    #[error("invalid list members: {}", .0.join(", "))]
    InvalidMembers(Vec<String>),

    #[error("'{0}' is not a boolean")]
    NotBoolean(String),

    #[error("'{0}' is not a ratio of the form NUM:NUM")]
    NotRatio(String),

    #[error("ratio '{0}' divides by zero")]
    ZeroDenominator(String),

    #[error("'{0}' is not an integer")]
    NotInteger(String),

    #[error("'{0}' is not a number")]
    NotNumber(String),

    #[error("{value} is outside {range}")]
    OutOfRange { value: f64, range: StrictRange },

    #[error("{0} is not one of the allowed values")]
    NotAllowed(String),

    #[error("'{0}' is not a 3, 4, 6 or 8 digit hex colour")]
    NotHexColor(String),

    #[error("'{0}' is not a known colour keyword")]
    UnknownColor(String),

    #[error("'{0}' is not a valid timestamp")]
    NotTimestamp(String),

    #[error("'{0}' is not an http(s) URL")]
    NotUrl(String),
}

/// Run the processor matching `rule.kind`
pub fn apply_rule(raw: &str, rule: &ValueRule, schema: &Schema) -> Result<ParamValue, Rejection> {
    match rule.kind {
        RuleType::String => process_string(raw, Some(rule)),
        RuleType::List => process_list(raw, Some(rule)),
        RuleType::Boolean => process_boolean(raw, Some(rule)),
        RuleType::Ratio => process_ratio(raw, Some(rule)),
        RuleType::Integer => process_integer(raw, Some(rule)),
        RuleType::Number => process_number(raw, Some(rule)),
        RuleType::UnitScalar => process_unit_scalar(raw, Some(rule)),
        RuleType::HexColor => process_hex_color(raw, Some(rule)),
        RuleType::ColorKeyword => process_color_keyword(raw, schema),
        RuleType::Timestamp => process_timestamp(raw, Some(rule)),
        RuleType::Url => process_url(raw, Some(rule)),
        RuleType::Path => process_path(raw, Some(rule)),
        RuleType::Font => process_font(raw, Some(rule)),
    }
}

/// Any non-empty string, unchanged
pub fn process_string(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    if raw.is_empty() {
        return Err(Rejection::Empty);
    }
    Ok(ParamValue::String(raw.to_string()))
}

/// Comma separated items; with `possible_values`, every item must be allowed
pub fn process_list(raw: &str, rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    if raw.is_empty() {
        return Err(Rejection::Empty);
    }
    let items: Vec<String> = raw.split(',').map(str::to_string).collect();

    if let Some(allowed) = rule.and_then(|r| r.possible_values.as_ref()) {
        let invalid: Vec<String> = items
            .iter()
            .filter(|item| !allowed.iter().any(|v| v.as_text() == Some(item.as_str())))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(Rejection::InvalidMembers(invalid));
        }
    }

    Ok(ParamValue::List(items))
}

pub fn process_boolean(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    match raw {
        "true" | "1" | "yes" => Ok(ParamValue::Boolean(true)),
        "false" | "0" | "no" => Ok(ParamValue::Boolean(false)),
        _ => Err(Rejection::NotBoolean(raw.to_string())),
    }
}

/// `NUM:NUM`, evaluated to first / second
pub fn process_ratio(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    let caps = RATIO_PATTERN
        .captures(raw)
        .ok_or_else(|| Rejection::NotRatio(raw.to_string()))?;

    let first: f64 = caps[1]
        .parse()
        .map_err(|_| Rejection::NotRatio(raw.to_string()))?;
    let second: f64 = caps[2]
        .parse()
        .map_err(|_| Rejection::NotRatio(raw.to_string()))?;

    if second == 0.0 {
        return Err(Rejection::ZeroDenominator(raw.to_string()));
    }

    Ok(ParamValue::Number(first / second))
}

/// Base-10 integer. `strict_range` rejects out-of-range values and takes
/// precedence over `possible_values`.
pub fn process_integer(raw: &str, rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    let value: i64 = raw
        .parse()
        .map_err(|_| Rejection::NotInteger(raw.to_string()))?;

    if let Some(range) = rule.and_then(|r| r.strict_range) {
        if !range.contains(value as f64) {
            return Err(Rejection::OutOfRange {
                value: value as f64,
                range,
            });
        }
    } else if let Some(allowed) = rule.and_then(|r| r.possible_values.as_ref()) {
        let member = allowed.iter().any(|v| match v {
            Literal::Integer(n) => *n == value,
            Literal::Number(n) => *n == value as f64,
            _ => false,
        });
        if !member {
            return Err(Rejection::NotAllowed(raw.to_string()));
        }
    }

    Ok(ParamValue::Integer(value))
}

fn parse_finite(raw: &str) -> Result<f64, Rejection> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Rejection::NotNumber(raw.to_string())),
    }
}

/// Float. `strict_range` clamps instead of rejecting.
pub fn process_number(raw: &str, rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    let value = parse_finite(raw)?;
    let value = match rule.and_then(|r| r.strict_range) {
        Some(range) => range.clamp(value),
        None => value,
    };
    Ok(ParamValue::Number(value))
}

/// Float. `strict_range` rejects out-of-range values.
pub fn process_unit_scalar(raw: &str, rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    let value = parse_finite(raw)?;
    if let Some(range) = rule.and_then(|r| r.strict_range) {
        if !range.contains(value) {
            return Err(Rejection::OutOfRange { value, range });
        }
    }
    Ok(ParamValue::UnitScalar(value))
}

/// 3/4/6/8 hex digits without `#`; emitted with a leading `#`
pub fn process_hex_color(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    if !HEX_COLOR_PATTERN.is_match(raw) {
        return Err(Rejection::NotHexColor(raw.to_string()));
    }
    Ok(ParamValue::String(format!("#{}", raw)))
}

pub fn process_color_keyword(raw: &str, schema: &Schema) -> Result<ParamValue, Rejection> {
    if !schema.is_color_keyword(raw) {
        return Err(Rejection::UnknownColor(raw.to_string()));
    }
    Ok(ParamValue::String(raw.to_string()))
}

/// Unix seconds, RFC 3339, or a bare `YYYY-MM-DD` date; must lie after the epoch
pub fn process_timestamp(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    let parsed: Option<DateTime<Utc>> = if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
    {
        raw.parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        Some(dt.with_timezone(&Utc))
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    };

    match parsed {
        Some(ts) if ts.timestamp_millis() > 0 => Ok(ParamValue::Timestamp(ts)),
        _ => Err(Rejection::NotTimestamp(raw.to_string())),
    }
}

pub fn process_url(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    if !URL_PATTERN.is_match(raw) {
        return Err(Rejection::NotUrl(raw.to_string()));
    }
    Ok(ParamValue::String(raw.to_string()))
}

/// Not validated; accepted as an opaque string
pub fn process_path(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    Ok(ParamValue::String(raw.to_string()))
}

/// Not validated; accepted as an opaque string
pub fn process_font(raw: &str, _rule: Option<&ValueRule>) -> Result<ParamValue, Rejection> {
    Ok(ParamValue::String(raw.to_string()))
}
