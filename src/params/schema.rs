//! Declarative parameter schema
//!
//! The schema is a static data asset: for each canonical parameter name it
//! lists aliases, a category, the ordered value rules a raw value may satisfy,
//! optional dependencies on other parameters and an optional default.
//!
//! The built-in asset lives in `schema.json` next to this file and is parsed
//! once per process (see [`Schema::builtin`]).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::value::Literal;

static BUILTIN: Lazy<Schema> = Lazy::new(|| {
    Schema::from_json(include_str!("schema.json")).expect("built-in parameter schema is valid")
});

/// Errors raised while loading a schema asset
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Alias '{alias}' of '{param}' collides with an existing name")]
    AliasCollision { alias: String, param: String },

    #[error("Parameter '{param}' depends on unknown parameter '{dependency}'")]
    UnknownDependency { param: String, dependency: String },
}

/// Parameter grouping, used by the executor to order operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Size,
    Auto,
    Fill,
    Background,
    Stylize,
    Adjustment,
    Format,
    FocalpointCrop,
    PixelDensity,
    Rotation,
    NoiseReduction,
    Trim,
    Watermark,
    Text,
    Expiration,
    Security,
}

/// Value rule kinds, one per processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    String,
    List,
    Boolean,
    Ratio,
    Integer,
    Number,
    UnitScalar,
    HexColor,
    ColorKeyword,
    Timestamp,
    Url,
    Path,
    Font,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::String => "string",
            RuleType::List => "list",
            RuleType::Boolean => "boolean",
            RuleType::Ratio => "ratio",
            RuleType::Integer => "integer",
            RuleType::Number => "number",
            RuleType::UnitScalar => "unit_scalar",
            RuleType::HexColor => "hex_color",
            RuleType::ColorKeyword => "color_keyword",
            RuleType::Timestamp => "timestamp",
            RuleType::Url => "url",
            RuleType::Path => "path",
            RuleType::Font => "font",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds; either side may be open
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrictRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl StrictRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }
}

impl fmt::Display for StrictRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_else(|| "∞".into());
        write!(f, "[{}, {}]", bound(self.min), bound(self.max))
    }
}

/// One acceptable shape for a raw value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValueRule {
    #[serde(rename = "type")]
    pub kind: RuleType,
    #[serde(default)]
    pub possible_values: Option<Vec<Literal>>,
    #[serde(default)]
    pub strict_range: Option<StrictRange>,
    /// Rule-level default, consulted only when the parameter has none
    #[serde(default)]
    pub default: Option<Literal>,
}

impl ValueRule {
    pub fn new(kind: RuleType) -> Self {
        Self {
            kind,
            possible_values: None,
            strict_range: None,
            default: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.strict_range = Some(StrictRange::new(min, max));
        self
    }

    pub fn with_possible_values(mut self, values: Vec<Literal>) -> Self {
        self.possible_values = Some(values);
        self
    }
}

/// A `depends` entry: either mere presence of a key, or `key=value`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Dependency {
    Present(String),
    Equals { key: String, value: String },
}

impl Dependency {
    pub fn key(&self) -> &str {
        match self {
            Dependency::Present(key) | Dependency::Equals { key, .. } => key,
        }
    }
}

impl From<String> for Dependency {
    fn from(entry: String) -> Self {
        match entry.split_once('=') {
            Some((key, value)) => Dependency::Equals {
                key: key.to_string(),
                value: value.to_string(),
            },
            None => Dependency::Present(entry),
        }
    }
}

impl From<&str> for Dependency {
    fn from(entry: &str) -> Self {
        Dependency::from(entry.to_string())
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Present(key) => write!(f, "{}", key),
            Dependency::Equals { key, value } => write!(f, "{}={}", key, value),
        }
    }
}

/// Definition of one canonical parameter
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParameterDefinition {
    /// Canonical name, filled in from the map key on load
    #[serde(skip)]
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub depends: Vec<Dependency>,
    #[serde(default)]
    pub default: Option<Literal>,
    #[serde(default)]
    pub expects: Vec<ValueRule>,
}

impl ParameterDefinition {
    /// Expected rule kinds, in declared order (used in error messages)
    pub fn expected_types(&self) -> Vec<RuleType> {
        self.expects.iter().map(|rule| rule.kind).collect()
    }
}

#[derive(Deserialize)]
struct SchemaFile {
    parameters: BTreeMap<String, ParameterDefinition>,
    #[serde(default)]
    color_keywords: BTreeMap<String, String>,
}

/// Immutable parameter schema
#[derive(Debug, Clone)]
pub struct Schema {
    parameters: BTreeMap<String, ParameterDefinition>,
    color_keywords: BTreeMap<String, String>,
    /// alias -> canonical name
    aliases: BTreeMap<String, String>,
}

impl Schema {
    /// The compiled-in schema, parsed on first use
    pub fn builtin() -> &'static Schema {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(json)?;
        Self::new(file.parameters, file.color_keywords)
    }

    pub fn new(
        mut parameters: BTreeMap<String, ParameterDefinition>,
        color_keywords: BTreeMap<String, String>,
    ) -> Result<Self, SchemaError> {
        let mut aliases = BTreeMap::new();

        for (name, definition) in parameters.iter_mut() {
            definition.name = name.clone();
        }

        for (name, definition) in &parameters {
            for alias in &definition.aliases {
                if parameters.contains_key(alias) || aliases.contains_key(alias) {
                    return Err(SchemaError::AliasCollision {
                        alias: alias.clone(),
                        param: name.clone(),
                    });
                }
                aliases.insert(alias.clone(), name.clone());
            }
            for dependency in &definition.depends {
                if !parameters.contains_key(dependency.key()) {
                    return Err(SchemaError::UnknownDependency {
                        param: name.clone(),
                        dependency: dependency.key().to_string(),
                    });
                }
            }
        }

        Ok(Self {
            parameters,
            color_keywords: color_keywords
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            aliases,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// All definitions in canonical-name order
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.parameters.values()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// alias -> canonical name
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_color_keyword(&self, keyword: &str) -> bool {
        self.color_keywords.contains_key(keyword)
    }

    /// Hex digits (no `#`) for a CSS colour keyword
    pub fn color_hex(&self, keyword: &str) -> Option<&str> {
        self.color_keywords
            .get(&keyword.to_lowercase())
            .map(String::as_str)
    }
}
