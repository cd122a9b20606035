//! Schema resolution engine
//!
//! Turns a raw parameter bag into a total [`EditPlan`]:
//!
//! 1. alias keys are rewritten to canonical names
//! 2. unknown keys and empty values are ignored
//! 3. each supplied value is tried against its rules in order, first success wins
//! 4. every parameter still missing receives its default (or no value)
//! 5. supplied items whose dependencies are unmet are demoted to `{ None, implicit }`
//!
//! Only step 3 can fail.

use std::collections::BTreeMap;
use tracing::debug;

use super::alias::{resolve_aliases, RawParams};
use super::error::EditError;
use super::plan::{EditPlan, ResolvedEditItem};
use super::processors::apply_rule;
use super::schema::{Dependency, ParameterDefinition, Schema};
use super::value::ParamValue;

/// Resolve `raw` against `schema`
pub fn resolve(raw: &RawParams, schema: &Schema) -> Result<EditPlan, EditError> {
    let params = resolve_aliases(raw, schema);
    let mut items: BTreeMap<String, ResolvedEditItem> = BTreeMap::new();
    let mut dependants: Vec<String> = Vec::new();

    for (name, raw_value) in &params {
        if raw_value.is_empty() {
            continue;
        }
        let Some(definition) = schema.get(name) else {
            continue;
        };
        let value = process_value(raw_value, definition, schema)?;
        if !definition.depends.is_empty() {
            dependants.push(name.clone());
        }
        items.insert(
            name.clone(),
            ResolvedEditItem::explicit(value, raw_value.clone(), definition.clone()),
        );
    }

    for definition in schema.parameters() {
        if !items.contains_key(&definition.name) {
            items.insert(
                definition.name.clone(),
                ResolvedEditItem::implicit(default_value(definition), definition.clone()),
            );
        }
    }

    enforce_dependencies(&mut items, &dependants);

    Ok(EditPlan::from_items(items))
}

/// First rule whose processor accepts `raw` determines the value
fn process_value(
    raw: &str,
    definition: &ParameterDefinition,
    schema: &Schema,
) -> Result<ParamValue, EditError> {
    if definition.expects.is_empty() {
        return Ok(ParamValue::String(raw.to_string()));
    }

    let mut reasons = Vec::with_capacity(definition.expects.len());
    for rule in &definition.expects {
        match apply_rule(raw, rule, schema) {
            Ok(value) => return Ok(value),
            Err(rejection) => reasons.push(rejection.to_string()),
        }
    }

    Err(EditError::validation(
        definition.name.clone(),
        raw,
        definition.expected_types(),
        reasons,
    ))
}

/// Parameter-level default first, then the first rule carrying one
fn default_value(definition: &ParameterDefinition) -> Option<ParamValue> {
    definition
        .default
        .as_ref()
        .or_else(|| definition.expects.iter().find_map(|rule| rule.default.as_ref()))
        .map(|literal| literal.to_value())
}

fn dependency_met(dependency: &Dependency, items: &BTreeMap<String, ResolvedEditItem>) -> bool {
    let value = items.get(dependency.key()).and_then(|item| item.value.as_ref());
    match (dependency, value) {
        (_, None) => false,
        (Dependency::Present(_), Some(_)) => true,
        (Dependency::Equals { value: expected, .. }, Some(actual)) => actual.matches(expected),
    }
}

/// Drop each supplied dependant none of whose `depends` entries hold.
///
/// Defaults are never dropped. Repeats until nothing changes, so a drop
/// that invalidates another supplied dependant is seen regardless of name
/// order.
fn enforce_dependencies(items: &mut BTreeMap<String, ResolvedEditItem>, dependants: &[String]) {
    loop {
        let current = &*items;
        let unmet: Vec<String> = dependants
            .iter()
            .filter_map(|name| current.get_key_value(name))
            .filter(|(_, item)| item.is_defined())
            .filter(|(_, item)| {
                !item
                    .definition
                    .depends
                    .iter()
                    .any(|dependency| dependency_met(dependency, current))
            })
            .map(|(name, _)| name.clone())
            .collect();

        if unmet.is_empty() {
            break;
        }

        for name in unmet {
            if let Some(item) = items.get_mut(&name) {
                debug!(
                    param = %name,
                    depends = ?item.definition.depends,
                    "Dropping parameter with unmet dependency"
                );
                item.drop_value();
            }
        }
    }
}
