//! The attribute cell and its interactive creation request.

use tracing::warn;

use super::{AttributeDictionary, AttributeList, Category, ElementId, TypeHandle, TypeRegistry, Value};
use crate::error::Result;
use crate::functions::{FunctionRegistry, PolicyHandle, ValidatorHandle};
use crate::model::CompositeNode;

/// A single tagged value cell, leaf or container.
///
/// An attribute is owned by exactly one container slot. Moving it means
/// removing it from one container and inserting it into another; there is no
/// shared ownership and no back-reference to the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    value: Value,
    editable: bool,
    changed: bool,
    included_in_summary: bool,
    validator: Option<ValidatorHandle>,
    presentation_policy: Option<PolicyHandle>,
    identity: Option<ElementId>,
}

impl Attribute {
    /// An editable attribute with no validator or policy.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            editable: true,
            changed: false,
            included_in_summary: false,
            validator: None,
            presentation_policy: None,
            identity: None,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn in_summary(mut self) -> Self {
        self.included_in_summary = true;
        self
    }

    pub fn with_validator(mut self, validator: Option<ValidatorHandle>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_policy(mut self, policy: Option<PolicyHandle>) -> Self {
        self.presentation_policy = policy;
        self
    }

    /// Builds an attribute from an interactive creation request.
    ///
    /// The type must resolve and the initial text (if any) must parse. Unknown
    /// validator or policy names are logged and left unset, so the defaults
    /// apply later.
    pub fn from_request(
        request: &AttributeRequest,
        types: &TypeRegistry,
        functions: &FunctionRegistry,
    ) -> Result<Attribute> {
        let handle = types.resolve_type(&request.type_name)?;
        let value = match &request.initial_text {
            Some(text) if handle.is_textual() => types.parse(&handle, text)?,
            _ => types.default_value(&handle)?,
        };

        let validator = request.validator.as_deref().and_then(|name| {
            let found = functions.validator(name);
            if found.is_none() {
                warn!(validator = name, "unknown validator requested, using default");
            }
            found
        });
        let policy = request.policy.as_deref().and_then(|name| {
            let found = functions.policy(name);
            if found.is_none() {
                warn!(policy = name, "unknown policy requested, using default");
            }
            found
        });

        let mut attribute = Attribute::new(value)
            .with_validator(validator)
            .with_policy(policy);
        attribute.editable = request.editable;
        attribute.included_in_summary = request.included_in_summary;
        Ok(attribute)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Replaces the value and marks the attribute changed.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
        self.changed = true;
    }

    pub fn category(&self) -> Category {
        self.value.category()
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.value.type_handle()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    pub fn is_included_in_summary(&self) -> bool {
        self.included_in_summary
    }

    pub fn validator(&self) -> Option<&ValidatorHandle> {
        self.validator.as_ref()
    }

    pub fn presentation_policy(&self) -> Option<&PolicyHandle> {
        self.presentation_policy.as_ref()
    }

    /// Stable list-element identity, if this attribute lives in a list.
    pub fn identity(&self) -> Option<ElementId> {
        self.identity
    }

    pub(crate) fn set_identity(&mut self, id: ElementId) {
        self.identity = Some(id);
    }

    /// True if this attribute, or anything below it, changed since the last
    /// [`clear_changed`](Self::clear_changed).
    pub fn is_changed(&self) -> bool {
        if self.changed {
            return true;
        }
        match &self.value {
            Value::Dictionary(dict) => dict.is_changed(),
            Value::List(list) => list.is_changed(),
            Value::Node(node) => node.is_changed(),
            _ => false,
        }
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
        match &mut self.value {
            Value::Dictionary(dict) => dict.clear_changed(),
            Value::List(list) => list.clear_changed(),
            Value::Node(node) => node.clear_changed(),
            _ => {}
        }
    }

    pub fn dictionary(&self) -> Option<&AttributeDictionary> {
        match &self.value {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn dictionary_mut(&mut self) -> Option<&mut AttributeDictionary> {
        match &mut self.value {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&AttributeList> {
        match &self.value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn list_mut(&mut self) -> Option<&mut AttributeList> {
        match &mut self.value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&CompositeNode> {
        match &self.value {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<&mut CompositeNode> {
        match &mut self.value {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// What the authoring UI collects when the user adds a new attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRequest {
    /// Resolved through [`TypeRegistry::resolve_type`]
    pub type_name: String,
    /// Parsed into the initial value; the type's default when absent
    pub initial_text: Option<String>,
    pub editable: bool,
    pub included_in_summary: bool,
    pub validator: Option<String>,
    pub policy: Option<String>,
}

impl AttributeRequest {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            initial_text: None,
            editable: true,
            included_in_summary: false,
            validator: None,
            policy: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.initial_text = Some(text.into());
        self
    }
}
