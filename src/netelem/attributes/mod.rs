//! # Attribute Model
//!
//! The value store every other part of the engine works on.
//!
//! ## Components
//!
//! - [`Value`]: closed tagged union of everything an attribute can hold
//! - [`TypeRegistry`]: type lookup and the text conversion that editing relies on
//! - [`Attribute`]: a value plus its editing flags and function handles
//! - [`AttributeDictionary`] / [`AttributeList`]: the two ordered containers
//!
//! ## Ownership
//!
//! The tree is strictly single-owner. Containers own their attributes, a
//! node reference owns its node, and nothing points back up. Anything that
//! needs a parent (reconciliation links, key paths) keeps it outside the tree.

mod attribute;
mod dictionary;
mod list;
mod types;
mod value;

pub use attribute::{Attribute, AttributeRequest};
pub use dictionary::{observer, AttributeDictionary, ChangeObserver, ContainerEvent};
pub use list::{AttributeList, ElementId};
pub use types::{TypeHandle, TypeRegistry};
pub use value::{Category, EnumTag, Key, Value};
