// Parameter resolution unit tests
// Exercises the public params API against the built-in schema

use rstest::rstest;
use shutterline::params::processors::{
    process_boolean, process_integer, process_number, process_ratio, process_unit_scalar,
};
use shutterline::params::*;

fn plan_for(query: &str) -> Result<EditPlan, EditError> {
    resolve(&parse_query(query), Schema::builtin())
}

#[rstest]
#[case("15", Ok(ParamValue::Integer(15)))]
#[case("-10", Ok(ParamValue::Integer(-10)))]
#[case("100", Ok(ParamValue::Integer(100)))]
#[case("101", Err(()))]
#[case("12.5", Err(()))]
#[case("abc", Err(()))]
fn test_integer_rejects_outside_range(#[case] raw: &str, #[case] expected: Result<ParamValue, ()>) {
    let rule = ValueRule::new(RuleType::Integer).with_range(-10.0, 100.0);
    assert_eq!(process_integer(raw, Some(&rule)).map_err(|_| ()), expected);
}

#[rstest]
#[case("150", 100.0)]
#[case("-5", 0.0)]
#[case("42.5", 42.5)]
fn test_number_clamps_into_range(#[case] raw: &str, #[case] expected: f64) {
    let rule = ValueRule::new(RuleType::Number).with_range(0.0, 100.0);
    assert_eq!(
        process_number(raw, Some(&rule)).unwrap(),
        ParamValue::Number(expected)
    );
}

#[rstest]
#[case("0.5", true)]
#[case("1", true)]
#[case("1.5", false)]
#[case("-0.1", false)]
fn test_unit_scalar_rejects_outside_range(#[case] raw: &str, #[case] accepted: bool) {
    let rule = ValueRule::new(RuleType::UnitScalar).with_range(0.0, 1.0);
    assert_eq!(process_unit_scalar(raw, Some(&rule)).is_ok(), accepted);
}

#[test]
fn test_ratio_evaluates_and_rejects_zero_denominator() {
    let value = process_ratio("16:9", None).unwrap().as_f64().unwrap();
    assert!((value - 16.0 / 9.0).abs() < 1e-9);
    assert!(matches!(
        process_ratio("1:0", None),
        Err(Rejection::ZeroDenominator(_))
    ));
    assert!(matches!(process_ratio("16x9", None), Err(Rejection::NotRatio(_))));
}

#[rstest]
#[case("true", true)]
#[case("1", true)]
#[case("false", false)]
#[case("0", false)]
fn test_boolean_spellings(#[case] raw: &str, #[case] expected: bool) {
    assert_eq!(process_boolean(raw, None).unwrap(), ParamValue::Boolean(expected));
}

#[rstest]
#[case("")]
#[case("w=300&h=200&fit=crop")]
#[case("width=10&f=fill&fill=solid&fill-color=red")]
#[case("unknown=1&another=2")]
fn test_plan_covers_every_schema_parameter(#[case] query: &str) {
    let schema = Schema::builtin();
    let plan = plan_for(query).unwrap();
    assert_eq!(plan.len(), schema.len());
    for definition in schema.parameters() {
        assert!(plan.get(&definition.name).is_some(), "missing {}", definition.name);
    }
}

#[test]
fn test_alias_wins_over_canonical_name() {
    let plan = plan_for("fit=crop&f=max").unwrap();
    assert_eq!(plan.str("fit"), Some("max"));
    assert!(plan.is_explicit("fit"));
}

#[test]
fn test_dependency_on_presence_drops_value() {
    let plan = plan_for("trim-pad=100").unwrap();
    let item = plan.get("trim-pad").unwrap();
    assert_eq!(item.value, None);
    assert!(item.implicit);

    let plan = plan_for("trim=auto&trim-pad=100").unwrap();
    assert_eq!(plan.f64("trim-pad"), Some(100.0));
}

#[test]
fn test_dependency_on_value_drops_quality_for_png() {
    let plan = plan_for("fm=png&q=75").unwrap();
    assert_eq!(plan.value("q"), None);
    assert!(!plan.is_explicit("q"));

    let plan = plan_for("fm=jpg&q=60").unwrap();
    assert_eq!(plan.f64("q"), Some(60.0));
}

#[test]
fn test_defaults_are_implicit() {
    let plan = plan_for("").unwrap();
    assert_eq!(plan.str("fit"), Some("clip"));
    assert!(!plan.is_explicit("fit"));
    assert_eq!(plan.f64("dpr"), Some(1.0));
    assert_eq!(plan.value("q"), Some(&ParamValue::Integer(75)));
    assert!(!plan.is_explicit("q"));
    assert_eq!(plan.value("fill-color"), Some(&ParamValue::String("#fff".into())));
}

#[test]
fn test_validation_failure_names_parameter() {
    match plan_for("w=abc").unwrap_err() {
        EditError::ValidationFailure {
            param,
            value,
            expected,
            reasons,
        } => {
            assert_eq!(param, "w");
            assert_eq!(value, "abc");
            assert_eq!(expected, vec![RuleType::Integer, RuleType::UnitScalar]);
            assert_eq!(reasons.len(), 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_width_fraction_uses_unit_scalar() {
    let plan = plan_for("w=0.5").unwrap();
    assert_eq!(plan.value("w"), Some(&ParamValue::UnitScalar(0.5)));
    let plan = plan_for("w=640").unwrap();
    assert_eq!(plan.value("w"), Some(&ParamValue::Integer(640)));
}

#[test]
fn test_empty_and_unknown_parameters_are_ignored() {
    let plan = plan_for("w=&bogus=1").unwrap();
    assert_eq!(plan.value("w"), None);
    assert_eq!(plan.explicit_items().count(), 0);
}

#[test]
fn test_canonical_query_reproduces_plan() {
    let plan = plan_for("width=250&h=500&f=crop&crop=left,top&fm=png").unwrap();
    let query = plan.to_query();
    assert_eq!(query, "crop=left%2Ctop&fit=crop&fm=png&h=500&w=250");

    let again = plan_for(&query).unwrap();
    assert_eq!(again, plan);
}

#[test]
fn test_resolving_resolved_bag_is_idempotent() {
    let plan = plan_for("w=300&fit=fill&fill=solid&fill-color=ff0000&fm=jpg&q=90").unwrap();
    let again = resolve(&plan.to_raw_params(), Schema::builtin()).unwrap();
    for (name, item) in plan.items() {
        assert_eq!(again.value(name), item.value.as_ref(), "{name} changed");
    }
}

#[test]
fn test_parse_query_decodes_pairs() {
    let raw = parse_query("?txt=hello+world&mark=%2Flogo.png&flag&w=1&w=2");
    assert_eq!(raw.get("txt").map(String::as_str), Some("hello world"));
    assert_eq!(raw.get("mark").map(String::as_str), Some("/logo.png"));
    assert_eq!(raw.get("flag").map(String::as_str), Some(""));
    assert_eq!(raw.get("w").map(String::as_str), Some("2"));
}

#[test]
fn test_custom_schema_from_json() {
    let schema = Schema::from_json(
        r#"{
            "parameters": {
                "trim": {"category": "trim", "expects": [{"type": "string"}]},
                "trim-pad": {
                    "category": "trim",
                    "depends": ["trim"],
                    "expects": [{"type": "integer", "strict_range": {"min": 0, "max": 10}}]
                }
            }
        }"#,
    )
    .unwrap();

    let mut raw = RawParams::new();
    raw.insert("trim-pad".into(), "5".into());
    let plan = resolve(&raw, &schema).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.value("trim-pad"), None);
}
