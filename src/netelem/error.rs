use thiserror::Error;

use crate::functions::FunctionKind;
use crate::model::{KeyPath, RoleId, Segment};
use crate::reconcile::LinkId;

/// Text does not parse to the target type.
///
/// Recovered locally: the display reverts and the value stays unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {text:?} to {type_name}: {reason}{}", path_suffix(.path))]
pub struct ConversionError {
    pub type_name: String,
    pub text: String,
    pub reason: String,
    pub path: Option<KeyPath>,
}

impl ConversionError {
    pub fn new(type_name: impl Into<String>, text: &str, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            text: text.to_string(),
            reason: reason.into(),
            path: None,
        }
    }

    /// Tags the error with the key path of the attribute being converted.
    pub fn at(mut self, path: &KeyPath) -> Self {
        self.path = Some(path.clone());
        self
    }
}

fn path_suffix(path: &Option<KeyPath>) -> String {
    match path {
        Some(p) => format!(" (at {})", p),
        None => String::new(),
    }
}

/// A validator rejected an otherwise parsable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value at {path}: {message}")]
pub struct ValidationError {
    pub path: KeyPath,
    pub message: String,
}

/// A container already holds the key; the add was aborted and nothing changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate key: {key}")]
pub struct DuplicateKeyError {
    pub key: Segment,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown type: {name}")]
pub struct UnknownTypeError {
    pub name: String,
}

/// A link no longer matches the attribute tree it mirrors.
///
/// This is a broken identity contract, never a user error: the current pass
/// is aborted and the previous registry is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("reconciliation invariant violated at {path}: {detail}")]
pub struct ReconciliationInvariantViolation {
    pub path: KeyPath,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DuplicateKey(#[from] DuplicateKeyError),

    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    #[error(transparent)]
    Invariant(#[from] ReconciliationInvariantViolation),

    #[error("role {0} has no backup mirror")]
    NoBackupRole(RoleId),

    #[error("attribute at {0} is not editable")]
    NotEditable(KeyPath),

    #[error("link not found: {0}")]
    LinkNotFound(LinkId),

    #[error("{kind} '{name}' is already registered")]
    DuplicateFunction { kind: FunctionKind, name: String },

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("template error: {0}")]
    Template(#[from] stencil::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Key;

    #[test]
    fn conversion_error_mentions_path_when_tagged() {
        let path = KeyPath::from_segments(vec![
            Segment::Role(RoleId::Private),
            Segment::Key(Key::name("Round")),
        ]);
        let err = ConversionError::new("int", "abc", "invalid digit").at(&path);
        let text = err.to_string();
        assert!(text.contains("\"abc\""));
        assert!(text.contains("int"));
        assert!(text.contains("private/Round"));
    }

    #[test]
    fn conversion_error_without_path() {
        let err = ConversionError::new("bool", "maybe", "expected true or false");
        assert_eq!(
            err.to_string(),
            "cannot convert \"maybe\" to bool: expected true or false"
        );
    }

    #[test]
    fn crate_error_wraps_taxonomy() {
        let err: Error = DuplicateKeyError {
            key: Segment::Key(Key::name("Foo")),
        }
        .into();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(err.to_string(), "duplicate key: Foo");
    }
}
