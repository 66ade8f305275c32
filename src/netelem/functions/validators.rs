//! Built-in validators.
//!
//! Validators run when a textual edit is committed, after the text parsed
//! successfully. They see the raw text, not the parsed value.

use super::{ValidationContext, ValidatorFn};
use crate::attributes::Attribute;
use crate::model::CompositeNode;

pub const NOOP: &str = "noop";

pub const BUILTINS: &[(&str, ValidatorFn)] = &[
    (NOOP, noop),
    ("not_empty", not_empty),
    ("identifier", identifier),
    ("positive", positive),
    ("non_negative", non_negative),
    ("probability", probability),
];

type Outcome = Result<(), String>;

/// Accepts everything. The default when an attribute names no validator.
pub fn noop(
    _ctx: &ValidationContext<'_>,
    _host: &CompositeNode,
    _parent: Option<&Attribute>,
    _attribute: &Attribute,
    _text: &str,
) -> Outcome {
    Ok(())
}

pub fn not_empty(
    _ctx: &ValidationContext<'_>,
    _host: &CompositeNode,
    _parent: Option<&Attribute>,
    _attribute: &Attribute,
    text: &str,
) -> Outcome {
    if text.trim().is_empty() {
        return Err("value must not be empty".to_string());
    }
    Ok(())
}

/// Names used as keys and in generated code.
///
/// # Rules
/// - Only ASCII letters, digits, underscores and hyphens
/// - Must start with a letter
/// - No consecutive hyphens (`--`)
/// - Cannot end with a hyphen
pub fn identifier(
    _ctx: &ValidationContext<'_>,
    _host: &CompositeNode,
    _parent: Option<&Attribute>,
    _attribute: &Attribute,
    text: &str,
) -> Outcome {
    check_identifier(text)
}

fn check_identifier(name: &str) -> Outcome {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| "name must not be empty".to_string())?;
    if !first.is_ascii_alphabetic() {
        return Err(format!("name must start with a letter, not '{}'", first));
    }
    if name.ends_with('-') {
        return Err("name cannot end with a hyphen".to_string());
    }

    let mut prev_was_hyphen = false;
    for ch in name.chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
            return Err(format!("invalid character '{}' in name", ch));
        }
        if ch == '-' && prev_was_hyphen {
            return Err("name cannot contain consecutive hyphens".to_string());
        }
        prev_was_hyphen = ch == '-';
    }
    Ok(())
}

/// A finite number; NaN and infinities are rejected.
fn number(text: &str) -> Result<f64, String> {
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", text))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", text));
    }
    Ok(value)
}

pub fn positive(
    _ctx: &ValidationContext<'_>,
    _host: &CompositeNode,
    _parent: Option<&Attribute>,
    _attribute: &Attribute,
    text: &str,
) -> Outcome {
    if number(text)? <= 0.0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(())
}

pub fn non_negative(
    _ctx: &ValidationContext<'_>,
    _host: &CompositeNode,
    _parent: Option<&Attribute>,
    _attribute: &Attribute,
    text: &str,
) -> Outcome {
    if number(text)? < 0.0 {
        return Err("value must not be negative".to_string());
    }
    Ok(())
}

pub fn probability(
    _ctx: &ValidationContext<'_>,
    _host: &CompositeNode,
    _parent: Option<&Attribute>,
    _attribute: &Attribute,
    text: &str,
) -> Outcome {
    let p = number(text)?;
    if !(0.0..=1.0).contains(&p) {
        return Err("value must be between 0 and 1".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{TypeRegistry, Value};
    use crate::model::{KeyPath, NodeKind};
    use crate::presentation::WindowKind;

    fn run(validator: ValidatorFn, text: &str) -> Outcome {
        let node = CompositeNode::new(NodeKind::Process, "p");
        let attr = Attribute::new(Value::text(""));
        let path = KeyPath::root();
        let types = TypeRegistry::new();
        let ctx = ValidationContext {
            path: &path,
            window: WindowKind::Edit,
            types: &types,
        };
        validator(&ctx, &node, None, &attr, text)
    }

    #[test]
    fn identifier_rules() {
        for ok in ["foo", "foo-bar", "foo_bar", "f7-bar8", "Round"] {
            assert!(run(identifier, ok).is_ok(), "{} should pass", ok);
        }
        for bad in ["", "-foo", "foo-", "foo--bar", "7foo", "foo bar", "foo.bar"] {
            assert!(run(identifier, bad).is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn numeric_ranges() {
        assert!(run(positive, "3").is_ok());
        assert!(run(positive, "0").is_err());
        assert!(run(non_negative, "0").is_ok());
        assert!(run(non_negative, "-0.5").is_err());
        assert!(run(probability, "0.25").is_ok());
        assert!(run(probability, "1.5").is_err());
        assert_eq!(
            run(positive, "abc").unwrap_err(),
            "'abc' is not a number"
        );
    }

    #[test]
    fn numeric_validators_reject_non_finite() {
        let validators: [ValidatorFn; 3] = [positive, non_negative, probability];
        for validator in validators {
            for text in ["NaN", "inf", "-inf", "infinity"] {
                assert_eq!(
                    run(validator, text).unwrap_err(),
                    format!("'{}' is not a finite number", text)
                );
            }
        }
    }

    #[test]
    fn not_empty_trims() {
        assert!(run(not_empty, "   ").is_err());
        assert!(run(not_empty, "x").is_ok());
        assert!(run(noop, "").is_ok());
    }
}
