use netelem::attributes::{TypeRegistry, Value};
use proptest::prelude::*;

fn roundtrip(types: &TypeRegistry, value: &Value) -> Value {
    let text = types.format(value);
    types.parse(&value.type_handle(), &text).unwrap()
}

proptest! {
    #[test]
    fn bool_roundtrip(v in any::<bool>()) {
        let types = TypeRegistry::new();
        prop_assert_eq!(roundtrip(&types, &Value::Bool(v)), Value::Bool(v));
    }

    #[test]
    fn int_roundtrip(v in any::<i64>()) {
        let types = TypeRegistry::new();
        prop_assert_eq!(roundtrip(&types, &Value::Int(v)), Value::Int(v));
    }

    #[test]
    fn float_roundtrip(v in any::<f64>().prop_filter("NaN never equals itself", |f| !f.is_nan())) {
        let types = TypeRegistry::new();
        prop_assert_eq!(roundtrip(&types, &Value::Float(v)), Value::Float(v));
    }

    #[test]
    fn text_roundtrip(v in ".*") {
        let types = TypeRegistry::new();
        prop_assert_eq!(roundtrip(&types, &Value::text(v.clone())), Value::text(v));
    }

    #[test]
    fn enum_roundtrip(
        members in prop::collection::btree_set("[A-Z][a-z]{0,6}", 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let members: Vec<String> = members.into_iter().collect();
        let mut types = TypeRegistry::new();
        types.declare_enum("Kind", members.clone()).unwrap();

        let member = pick.get(&members);
        let value = Value::tag("Kind", member.as_str());
        prop_assert_eq!(roundtrip(&types, &value), value.clone());

        let qualified = types.parse(&value.type_handle(), &format!("Kind.{}", member)).unwrap();
        prop_assert_eq!(qualified, value);
    }

    #[test]
    fn accepted_enum_members_always_roundtrip(
        members in prop::collection::btree_set("[ .A-Za-z]{0,8}", 1..6),
    ) {
        let members: Vec<String> = members.into_iter().collect();
        let mut types = TypeRegistry::new();
        if types.declare_enum("Kind", members.clone()).is_ok() {
            for member in &members {
                let value = Value::tag("Kind", member.as_str());
                prop_assert_eq!(roundtrip(&types, &value), value.clone());
            }
        }
    }
}

#[test]
fn enum_members_that_cannot_read_back_are_rejected() {
    let mut types = TypeRegistry::new();
    assert!(types.declare_enum("E", [" X"]).is_err());
    assert!(types.declare_enum("E", ["X "]).is_err());
    assert!(types.declare_enum("E", [""]).is_err());
    assert!(types.declare_enum("A", ["A.B", "B"]).is_err());
    assert!(types.resolve_type("A").is_err());

    types.declare_enum("A", ["AB", "B.A"]).unwrap();
    let value = Value::tag("A", "B.A");
    assert_eq!(roundtrip(&types, &value), value);
}

#[test]
fn bool_text_is_case_insensitive() {
    let types = TypeRegistry::new();
    let handle = Value::Bool(false).type_handle();
    assert_eq!(types.parse(&handle, "TRUE").unwrap(), Value::Bool(true));
    assert!(types.parse(&handle, "yes").is_err());
}

#[test]
fn containers_do_not_parse() {
    let types = TypeRegistry::new();
    let err = types.parse(&Value::list().type_handle(), "List(0)").unwrap_err();
    assert!(err.reason.contains("not convertible"));
}
