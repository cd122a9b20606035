//! Alias resolution
//!
//! Rewrites a raw parameter bag so every aliased key is stored under its
//! canonical name. When both an alias and its canonical key are present, the
//! alias value wins.

use std::collections::BTreeMap;

use super::schema::Schema;

/// Raw query parameters: key -> undecoded-by-schema string value
pub type RawParams = BTreeMap<String, String>;

/// Replace every alias key in `raw` with its canonical name
pub fn resolve_aliases(raw: &RawParams, schema: &Schema) -> RawParams {
    let mut resolved: RawParams = raw
        .iter()
        .filter(|(key, _)| !schema.aliases().contains_key(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (key, value) in raw {
        if let Some(canonical) = schema.aliases().get(key) {
            resolved.insert(canonical.clone(), value.clone());
        }
    }

    resolved
}
