//! Type lookup and string conversion.
//!
//! [`TypeRegistry`] replaces runtime type discovery: every type an attribute can
//! hold is either built in (scalars, text, containers, node references) or an
//! enum declared explicitly with [`TypeRegistry::declare_enum`].
//!
//! ## Round-trip law
//!
//! For every primitive, text and enum value `v`:
//!
//! ```text
//! registry.parse(&v.type_handle(), &registry.format(&v)) == Ok(v)
//! ```

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::{EnumTag, Value};
use crate::error::{ConversionError, Error, Result, UnknownTypeError};

/// A resolved attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHandle {
    Bool,
    Int,
    Float,
    Text,
    /// A declared enum, by name
    Enum(String),
    Node,
    List,
    Dictionary,
}

impl TypeHandle {
    /// Whether values of this type can be typed in as text.
    pub fn is_textual(&self) -> bool {
        !matches!(
            self,
            TypeHandle::Node | TypeHandle::List | TypeHandle::Dictionary
        )
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHandle::Bool => f.write_str("bool"),
            TypeHandle::Int => f.write_str("int"),
            TypeHandle::Float => f.write_str("float"),
            TypeHandle::Text => f.write_str("string"),
            TypeHandle::Enum(name) => f.write_str(name),
            TypeHandle::Node => f.write_str("node"),
            TypeHandle::List => f.write_str("list"),
            TypeHandle::Dictionary => f.write_str("dictionary"),
        }
    }
}

/// Names the built-in types resolve from. The first name of each handle is canonical.
static BUILTIN_NAMES: Lazy<HashMap<&'static str, TypeHandle>> = Lazy::new(|| {
    HashMap::from([
        ("bool", TypeHandle::Bool),
        ("boolean", TypeHandle::Bool),
        ("int", TypeHandle::Int),
        ("integer", TypeHandle::Int),
        ("i64", TypeHandle::Int),
        ("float", TypeHandle::Float),
        ("double", TypeHandle::Float),
        ("f64", TypeHandle::Float),
        ("string", TypeHandle::Text),
        ("text", TypeHandle::Text),
        ("node", TypeHandle::Node),
        ("list", TypeHandle::List),
        ("dictionary", TypeHandle::Dictionary),
        ("dict", TypeHandle::Dictionary),
    ])
});

/// Conversion and lookup service for attribute types.
///
/// Pure apart from the enum declarations it holds.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    enums: BTreeMap<String, Vec<String>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a closed tag set. Members keep their declaration order.
    ///
    /// Fails if the name clashes with a built-in or declared type, if there
    /// are no members, or if a member repeats. Members must also read back
    /// through [`parse`](Self::parse): no blank or padded text and no
    /// `Name.` prefix.
    pub fn declare_enum<I, S>(&mut self, name: &str, members: I) -> Result<TypeHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if BUILTIN_NAMES.contains_key(name.to_lowercase().as_str()) {
            return Err(Error::InvalidDeclaration(format!(
                "'{}' is a built-in type",
                name
            )));
        }
        if self.enums.contains_key(name) {
            return Err(Error::InvalidDeclaration(format!(
                "enum '{}' is already declared",
                name
            )));
        }

        let mut declared: Vec<String> = Vec::new();
        for member in members {
            let member = member.into();
            if member.is_empty() || member.trim() != member {
                return Err(Error::InvalidDeclaration(format!(
                    "enum '{}' has a blank or padded member '{}'",
                    name, member
                )));
            }
            if member
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('.'))
            {
                return Err(Error::InvalidDeclaration(format!(
                    "enum '{}' member '{}' reads as a qualified name",
                    name, member
                )));
            }
            if declared.contains(&member) {
                return Err(Error::InvalidDeclaration(format!(
                    "enum '{}' repeats member '{}'",
                    name, member
                )));
            }
            declared.push(member);
        }
        if declared.is_empty() {
            return Err(Error::InvalidDeclaration(format!(
                "enum '{}' has no members",
                name
            )));
        }

        self.enums.insert(name.to_string(), declared);
        Ok(TypeHandle::Enum(name.to_string()))
    }

    /// Resolves a type by name. Built-in names are case-insensitive; enum
    /// names match exactly.
    pub fn resolve_type(&self, name: &str) -> std::result::Result<TypeHandle, UnknownTypeError> {
        let trimmed = name.trim();
        if let Some(handle) = BUILTIN_NAMES.get(trimmed.to_lowercase().as_str()) {
            return Ok(handle.clone());
        }
        if self.enums.contains_key(trimmed) {
            return Ok(TypeHandle::Enum(trimmed.to_string()));
        }
        Err(UnknownTypeError {
            name: trimmed.to_string(),
        })
    }

    /// Every resolvable type name: canonical built-ins first, then enums by name.
    pub fn type_names(&self) -> Vec<String> {
        let builtins = [
            TypeHandle::Bool,
            TypeHandle::Int,
            TypeHandle::Float,
            TypeHandle::Text,
            TypeHandle::Node,
            TypeHandle::List,
            TypeHandle::Dictionary,
        ];
        builtins
            .iter()
            .map(|h| h.to_string())
            .chain(self.enums.keys().cloned())
            .collect()
    }

    /// Parses text into a value of the given type.
    pub fn parse(
        &self,
        handle: &TypeHandle,
        text: &str,
    ) -> std::result::Result<Value, ConversionError> {
        let type_name = handle.to_string();
        match handle {
            TypeHandle::Bool => match text.trim().to_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(ConversionError::new(
                    type_name,
                    text,
                    "expected true or false",
                )),
            },
            TypeHandle::Int => text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| ConversionError::new(type_name, text, e.to_string())),
            TypeHandle::Float => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ConversionError::new(type_name, text, e.to_string())),
            TypeHandle::Text => Ok(Value::Text(text.to_string())),
            TypeHandle::Enum(name) => {
                let members = self.enums.get(name).ok_or_else(|| {
                    ConversionError::new(type_name.clone(), text, "enum is not declared")
                })?;
                let trimmed = text.trim();
                let member = trimmed
                    .strip_prefix(name.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(trimmed);
                if members.iter().any(|m| m == member) {
                    Ok(Value::Enum(EnumTag::new(name.as_str(), member)))
                } else {
                    Err(ConversionError::new(
                        type_name,
                        text,
                        format!("expected one of: {}", members.join(", ")),
                    ))
                }
            }
            TypeHandle::Node | TypeHandle::List | TypeHandle::Dictionary => Err(
                ConversionError::new(type_name, text, "not convertible from text"),
            ),
        }
    }

    /// Formats a value; the exact inverse of [`parse`](Self::parse) for
    /// primitive, text and enum values.
    pub fn format(&self, value: &Value) -> String {
        value.to_string()
    }

    /// Members of an enum type in declaration order. Empty for other types.
    pub fn enum_members(&self, handle: &TypeHandle) -> Vec<EnumTag> {
        match handle {
            TypeHandle::Enum(name) => self
                .enums
                .get(name)
                .map(|members| {
                    members
                        .iter()
                        .map(|m| EnumTag::new(name.as_str(), m.as_str()))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Looks a tag up by its declared identifier.
    pub fn tag(&self, enum_type: &str, member: &str) -> Option<EnumTag> {
        self.enums
            .get(enum_type)?
            .iter()
            .find(|m| *m == member)
            .map(|m| EnumTag::new(enum_type, m.as_str()))
    }

    /// The value a fresh attribute of this type starts with.
    ///
    /// Enums default to their first declared member.
    pub fn default_value(&self, handle: &TypeHandle) -> Result<Value> {
        Ok(match handle {
            TypeHandle::Bool => Value::Bool(false),
            TypeHandle::Int => Value::Int(0),
            TypeHandle::Float => Value::Float(0.0),
            TypeHandle::Text => Value::Text(String::new()),
            TypeHandle::Enum(name) => {
                let first = self
                    .enums
                    .get(name)
                    .and_then(|members| members.first())
                    .ok_or_else(|| UnknownTypeError { name: name.clone() })?;
                Value::Enum(EnumTag::new(name.as_str(), first.as_str()))
            }
            TypeHandle::List => Value::list(),
            TypeHandle::Dictionary => Value::dictionary(),
            TypeHandle::Node => {
                return Err(Error::InvalidOperation(
                    "a node reference has no default value; create the node first".to_string(),
                ))
            }
        })
    }
}
