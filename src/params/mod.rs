//! Parameter schema resolution
//!
//! Takes an untyped query-string bag and produces a normalized, type-checked
//! [`EditPlan`] covering every parameter of the schema:
//!
//! ```text
//! raw bag ─▶ alias resolver ─▶ value processors ─▶ defaults ─▶ dependencies ─▶ EditPlan
//! ```
//!
//! # Example
//!
//! ```
//! use shutterline::params::{parse_query, resolve, Schema};
//!
//! let raw = parse_query("width=300&f=crop&crop=top");
//! let plan = resolve(&raw, Schema::builtin()).unwrap();
//! assert_eq!(plan.f64("w"), Some(300.0));
//! assert_eq!(plan.list("crop"), ["top"]);
//! ```

pub mod alias;
pub mod error;
pub mod plan;
pub mod processors;
pub mod resolver;
pub mod schema;
pub mod value;

pub use alias::{resolve_aliases, RawParams};
pub use error::EditError;
pub use plan::{EditPlan, ResolvedEditItem};
pub use processors::Rejection;
pub use resolver::resolve;
pub use schema::{Category, Dependency, ParameterDefinition, RuleType, Schema, SchemaError, ValueRule};
pub use value::{Literal, ParamValue};

/// Split a raw query string into a parameter bag.
///
/// Pairs are separated by `&` and split on the first `=`; both sides are
/// percent-decoded with `+` read as a space. A pair without `=` has an empty
/// value and later duplicates overwrite earlier ones.
pub fn parse_query(query: &str) -> RawParams {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = RawParams::new();

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        params.insert(key, decode_component(value));
    }

    params
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}
