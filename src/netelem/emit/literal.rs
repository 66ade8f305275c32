//! Rust identifiers and expressions for generated code.

use stencil::Casing;

use crate::attributes::{Attribute, Value};
use crate::model::Segment;

const KEYWORDS: &[&str] = &["Self", "self", "super", "crate", "type", "fn", "mod", "match"];

/// An identifier in `casing` for free-form text.
///
/// Text without alphanumerics becomes `fallback`. A leading digit or a
/// reserved word gets a prefix so the result is always a valid identifier.
pub fn ident(text: &str, casing: Casing, fallback: &str) -> String {
    let cased = casing.apply(text);
    if cased.is_empty() {
        return fallback.to_string();
    }
    let starts_with_digit = cased.chars().next().is_some_and(|c| c.is_ascii_digit());
    if starts_with_digit || KEYWORDS.contains(&cased.as_str()) {
        return match casing {
            Casing::Pascal => format!("K{}", cased),
            Casing::Camel => format!("k{}", cased),
            Casing::Snake => format!("k_{}", cased),
            Casing::Screaming => format!("K_{}", cased),
        };
    }
    cased
}

/// Free-form words naming a path: roles in snake form, keys by their text.
pub fn path_words(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `candidate`, or the first `candidate_N` (N from 2) not in `taken`.
pub fn unique(candidate: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&candidate) {
        return candidate;
    }
    let separator = if candidate.ends_with(|c: char| c.is_ascii_digit()) {
        "_"
    } else {
        ""
    };
    (2..)
        .map(|n| format!("{}{}{}", candidate, separator, n))
        .find(|name| !taken(name))
        .unwrap_or(candidate)
}

pub fn string(text: &str) -> String {
    format!("{:?}", text)
}

fn float(v: f64) -> String {
    if v.is_nan() {
        "f64::NAN".to_string()
    } else if v == f64::INFINITY {
        "f64::INFINITY".to_string()
    } else if v == f64::NEG_INFINITY {
        "f64::NEG_INFINITY".to_string()
    } else {
        format!("{:?}", v)
    }
}

/// Constructor expression for a leaf value. `None` for containers.
pub fn value(value: &Value) -> Option<String> {
    Some(match value {
        Value::Bool(v) => format!("Value::Bool({})", v),
        Value::Int(v) => format!("Value::Int({})", v),
        Value::Float(v) => format!("Value::Float({})", float(*v)),
        Value::Text(v) => format!("Value::text({})", string(v)),
        Value::Enum(tag) => format!(
            "Value::tag({}, {})",
            string(&tag.enum_type),
            string(&tag.member)
        ),
        Value::Node(node) => format!(
            "Value::node(CompositeNode::new(NodeKind::{}, {}))",
            node.kind(),
            string(node.name())
        ),
        Value::List(_) | Value::Dictionary(_) => return None,
    })
}

/// `Attribute::new(..)` with the attribute's flags and named functions.
pub fn attribute(attribute: &Attribute, value_expr: &str) -> String {
    let mut expr = format!("Attribute::new({})", value_expr);
    if !attribute.is_editable() {
        expr.push_str(".read_only()");
    }
    if attribute.is_included_in_summary() {
        expr.push_str(".in_summary()");
    }
    if let Some(validator) = attribute.validator() {
        expr.push_str(&format!(
            ".with_validator(functions.validator({}))",
            string(validator.name())
        ));
    }
    if let Some(policy) = attribute.presentation_policy() {
        expr.push_str(&format!(
            ".with_policy(functions.policy({}))",
            string(policy.name())
        ));
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Key;
    use crate::functions::FunctionRegistry;
    use crate::model::{CompositeNode, NodeKind, RoleId};

    #[test]
    fn idents_are_always_valid() {
        assert_eq!(ident("max rounds", Casing::Screaming, "KEY"), "MAX_ROUNDS");
        assert_eq!(ident("2nd try", Casing::Pascal, "Key"), "K2ndTry");
        assert_eq!(ident("self", Casing::Pascal, "Key"), "KSelf");
        assert_eq!(ident("--", Casing::Snake, "key"), "key");
    }

    #[test]
    fn path_words_join_segments() {
        let segments = vec![
            Segment::Role(RoleId::OperationResults),
            Segment::Key(Key::name("Config")),
        ];
        assert_eq!(path_words(&segments), "operation_results Config");
        assert_eq!(
            ident(&path_words(&segments), Casing::Pascal, "Root"),
            "OperationResultsConfig"
        );
    }

    #[test]
    fn unique_appends_counter() {
        let taken = ["FOO", "FOO2"];
        assert_eq!(unique("FOO".into(), |n| taken.contains(&n)), "FOO3");
        assert_eq!(unique("BAR".into(), |n| taken.contains(&n)), "BAR");
        assert_eq!(unique("B1".into(), |n| n == "B1"), "B1_2");
    }

    #[test]
    fn leaf_values() {
        assert_eq!(value(&Value::Int(-3)).unwrap(), "Value::Int(-3)");
        assert_eq!(value(&Value::Float(1.0)).unwrap(), "Value::Float(1.0)");
        assert_eq!(
            value(&Value::Float(f64::NEG_INFINITY)).unwrap(),
            "Value::Float(f64::NEG_INFINITY)"
        );
        assert_eq!(
            value(&Value::text("say \"hi\"")).unwrap(),
            r#"Value::text("say \"hi\"")"#
        );
        assert_eq!(
            value(&Value::tag("State", "Idle")).unwrap(),
            r#"Value::tag("State", "Idle")"#
        );
        assert_eq!(
            value(&Value::node(CompositeNode::new(NodeKind::Channel, "c1"))).unwrap(),
            r#"Value::node(CompositeNode::new(NodeKind::Channel, "c1"))"#
        );
        assert!(value(&Value::list()).is_none());
    }

    #[test]
    fn attribute_carries_flags_and_functions() {
        let functions = FunctionRegistry::with_builtins();
        let attr = Attribute::new(Value::Int(1))
            .read_only()
            .with_validator(functions.validator("positive"));
        assert_eq!(
            attribute(&attr, "Value::Int(1)"),
            r#"Attribute::new(Value::Int(1)).read_only().with_validator(functions.validator("positive"))"#
        );
    }
}
