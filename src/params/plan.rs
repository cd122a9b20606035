//! Edit plan
//!
//! The resolver's output: one [`ResolvedEditItem`] for every parameter the
//! schema knows, whether or not the request supplied it.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::alias::RawParams;
use super::schema::{Category, ParameterDefinition};
use super::value::ParamValue;

/// Resolution result for a single parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEditItem {
    pub value: Option<ParamValue>,
    /// `false` only when the request supplied a value that passed validation
    pub implicit: bool,
    /// Raw accepted string for explicit items
    #[serde(skip)]
    pub raw: Option<String>,
    #[serde(skip)]
    pub definition: ParameterDefinition,
}

impl ResolvedEditItem {
    pub fn explicit(value: ParamValue, raw: impl Into<String>, definition: ParameterDefinition) -> Self {
        Self {
            value: Some(value),
            implicit: false,
            raw: Some(raw.into()),
            definition,
        }
    }

    pub fn implicit(value: Option<ParamValue>, definition: ParameterDefinition) -> Self {
        Self {
            value,
            implicit: true,
            raw: None,
            definition,
        }
    }

    /// Demote to `{ value: None, implicit: true }`
    pub fn drop_value(&mut self) {
        self.value = None;
        self.implicit = true;
        self.raw = None;
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

/// Total mapping from parameter name to resolved item
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditPlan {
    items: BTreeMap<String, ResolvedEditItem>,
}

impl EditPlan {
    pub(crate) fn from_items(items: BTreeMap<String, ResolvedEditItem>) -> Self {
        Self { items }
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedEditItem> {
        self.items.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.items.get(name).and_then(|item| item.value.as_ref())
    }

    pub fn is_explicit(&self, name: &str) -> bool {
        self.items.get(name).map_or(false, |item| !item.implicit)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(ParamValue::as_str)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(ParamValue::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(ParamValue::as_bool)
    }

    /// List items; scalar values are never coerced into a list
    pub fn list(&self, name: &str) -> &[String] {
        self.value(name).and_then(ParamValue::as_list).unwrap_or(&[])
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &ResolvedEditItem)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    /// Items the request supplied and that survived dependency checks
    pub fn explicit_items(&self) -> impl Iterator<Item = (&str, &ResolvedEditItem)> {
        self.items().filter(|(_, item)| !item.implicit)
    }

    /// Defined items of one category
    pub fn category(&self, category: Category) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.items().filter_map(move |(name, item)| {
            if item.definition.category == category {
                item.value.as_ref().map(|value| (name, value))
            } else {
                None
            }
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Raw bag of the explicit items, suitable for resolving again
    pub fn to_raw_params(&self) -> RawParams {
        self.explicit_items()
            .filter_map(|(name, item)| item.raw.clone().map(|raw| (name.to_string(), raw)))
            .collect()
    }

    /// Canonical query string: explicit items, canonical names, sorted keys
    pub fn to_query(&self) -> String {
        self.to_raw_params()
            .iter()
            .map(|(name, raw)| format!("{}={}", name, urlencoding::encode(raw)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Serialise only the explicit items
    pub fn explicit_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .explicit_items()
            .map(|(name, item)| {
                let value = serde_json::to_value(&item.value).unwrap_or(serde_json::Value::Null);
                (name.to_string(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Serialize for EditPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (name, item) in &self.items {
            map.serialize_entry(name, item)?;
        }
        map.end()
    }
}
