//! Attribute value types.
//!
//! This module defines the runtime representation of attribute values: a closed
//! tagged union with exhaustive matching over its [`Category`].

use std::fmt;

use super::{AttributeDictionary, AttributeList, TypeHandle};
use crate::model::{CompositeNode, RoleId};

/// The broad kind of an attribute, derived from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Numeric and boolean scalars
    Primitive,
    /// Free text
    Text,
    /// A tag out of a closed, declared set
    EnumValue,
    /// A nested composite node
    NodeReference,
    /// An ordered, index-addressed container
    AttributeList,
    /// An ordered, key-addressed container
    AttributeDictionary,
}

impl Category {
    /// Containers and node references are scanned with open/close pairs.
    pub fn is_complex(self) -> bool {
        matches!(
            self,
            Category::NodeReference | Category::AttributeList | Category::AttributeDictionary
        )
    }
}

/// A member of a declared enum type.
///
/// Tags compare structurally: two tags are equal when both the enum type and
/// the member name match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumTag {
    pub enum_type: String,
    pub member: String,
}

impl EnumTag {
    pub fn new(enum_type: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            enum_type: enum_type.into(),
            member: member.into(),
        }
    }

    /// `Type.Member` form, accepted back by the type registry parser.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.enum_type, self.member)
    }
}

impl fmt::Display for EnumTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.member)
    }
}

/// Dictionary key: either a plain name or an enum tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Name(String),
    Tag(EnumTag),
}

impl Key {
    pub fn name(name: impl Into<String>) -> Self {
        Key::Name(name.into())
    }

    pub fn tag(enum_type: impl Into<String>, member: impl Into<String>) -> Self {
        Key::Tag(EnumTag::new(enum_type, member))
    }

    /// The text shown for the key (the member name for tags).
    pub fn text(&self) -> &str {
        match self {
            Key::Name(name) => name,
            Key::Tag(tag) => &tag.member,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::name(name)
    }
}

impl From<EnumTag> for Key {
    fn from(tag: EnumTag) -> Self {
        Key::Tag(tag)
    }
}

/// Runtime representation of an attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Enum(EnumTag),
    Node(Box<CompositeNode>),
    List(AttributeList),
    Dictionary(AttributeDictionary),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn tag(enum_type: impl Into<String>, member: impl Into<String>) -> Self {
        Value::Enum(EnumTag::new(enum_type, member))
    }

    pub fn node(node: CompositeNode) -> Self {
        Value::Node(Box::new(node))
    }

    /// An empty dictionary value.
    pub fn dictionary() -> Self {
        Value::Dictionary(AttributeDictionary::new())
    }

    /// An empty list value.
    pub fn list() -> Self {
        Value::List(AttributeList::new())
    }

    pub fn category(&self) -> Category {
        match self {
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => Category::Primitive,
            Value::Text(_) => Category::Text,
            Value::Enum(_) => Category::EnumValue,
            Value::Node(_) => Category::NodeReference,
            Value::List(_) => Category::AttributeList,
            Value::Dictionary(_) => Category::AttributeDictionary,
        }
    }

    pub fn type_handle(&self) -> TypeHandle {
        match self {
            Value::Bool(_) => TypeHandle::Bool,
            Value::Int(_) => TypeHandle::Int,
            Value::Float(_) => TypeHandle::Float,
            Value::Text(_) => TypeHandle::Text,
            Value::Enum(tag) => TypeHandle::Enum(tag.enum_type.clone()),
            Value::Node(_) => TypeHandle::Node,
            Value::List(_) => TypeHandle::List,
            Value::Dictionary(_) => TypeHandle::Dictionary,
        }
    }

    /// Full recursive rendering, used when comparing snapshots.
    ///
    /// Unlike `Display`, containers include their children.
    pub fn deep_text(&self) -> String {
        match self {
            Value::Dictionary(dict) => {
                let entries: Vec<String> = dict
                    .iter()
                    .map(|(key, attr)| format!("{}: {}", key, attr.value().deep_text()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::List(list) => {
                let items: Vec<String> = list.iter().map(|a| a.value().deep_text()).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Node(node) => {
                let roles: Vec<String> = RoleId::SCANNABLE
                    .iter()
                    .filter(|role| !node.role(**role).is_empty())
                    .map(|role| {
                        let inner = Value::Dictionary(node.role(*role).clone()).deep_text();
                        format!("{}: {}", role, inner)
                    })
                    .collect();
                format!("{} {} {{{}}}", node.kind(), node.name(), roles.join(", "))
            }
            leaf => leaf.to_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumTag> {
        match self {
            Value::Enum(tag) => Some(tag),
            _ => None,
        }
    }
}

/// The single-line text of a value.
///
/// For primitive, text and enum values this is exactly what
/// [`TypeRegistry::parse`](super::TypeRegistry::parse) accepts back. Containers
/// render as a short summary.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Enum(tag) => write!(f, "{}", tag),
            Value::Node(node) => write!(f, "{} {}", node.kind(), node.name()),
            Value::List(list) => write!(f, "List({})", list.len()),
            Value::Dictionary(dict) => write!(f, "Dictionary({})", dict.len()),
        }
    }
}
