//! Presentation descriptors: the data contract handed to UI collaborators.
//!
//! The engine never creates widgets. For every visited attribute it produces
//! a [`PresentationDescriptor`] describing what to show and which kind of
//! input to offer; the UI renders it and calls back into the session on edit.

use serde::{Deserialize, Serialize};

use crate::attributes::Value;
use crate::error::Result;
use crate::functions::PolicyInput;
use crate::reconcile::LinkStatus;

/// The window a session presents for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Edit,
    Debug,
    ReadOnly,
}

impl WindowKind {
    pub fn allows_editing(self) -> bool {
        !matches!(self, WindowKind::ReadOnly)
    }
}

/// Input control offered for a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    #[default]
    None,
    Dropdown,
    FreeText,
    AddRemovePanel,
    Button,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewValueSpec {
    pub kind: WidgetKind,
    pub enabled: bool,
    /// Choices for a dropdown, in display order
    pub options: Vec<String>,
    pub current_value: String,
}

impl NewValueSpec {
    /// No input control at all.
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationDescriptor {
    pub key_text: String,
    pub existing_value_text: String,
    pub type_text: String,
    pub new_value: NewValueSpec,
    pub status: LinkStatus,
    /// The existing value differs from the pre-step backup
    pub emphasized: bool,
    /// Some descendant's existing value changed during the last scan
    pub contains_changes: bool,
}

impl PresentationDescriptor {
    /// A descriptor showing key, value and type with no input control.
    pub fn display_only(input: &PolicyInput<'_>) -> Self {
        Self {
            key_text: input.key.to_string(),
            existing_value_text: input.attribute.value().to_string(),
            type_text: input.attribute.type_handle().to_string(),
            new_value: NewValueSpec::none(),
            status: LinkStatus::NotUpdated,
            emphasized: false,
            contains_changes: false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The identity policy: picks the input control from the attribute's category.
///
/// | Value | Control |
/// |-------|---------|
/// | enum | dropdown of the declared members |
/// | bool | dropdown `false` / `true` |
/// | int, float, text | free text |
/// | list, dictionary | add/remove panel |
/// | node | button opening the node |
pub fn default_policy(input: &PolicyInput<'_>) -> PresentationDescriptor {
    let mut descriptor = PresentationDescriptor::display_only(input);
    let value = input.attribute.value();
    let can_edit = input.editable && input.window.allows_editing();
    let current_value = value.to_string();

    descriptor.new_value = match value {
        Value::Enum(tag) => NewValueSpec {
            kind: WidgetKind::Dropdown,
            enabled: can_edit,
            options: input
                .types
                .enum_members(&value.type_handle())
                .into_iter()
                .map(|t| t.member)
                .collect(),
            current_value: tag.member.clone(),
        },
        Value::Bool(_) => NewValueSpec {
            kind: WidgetKind::Dropdown,
            enabled: can_edit,
            options: vec!["false".to_string(), "true".to_string()],
            current_value,
        },
        Value::Int(_) | Value::Float(_) | Value::Text(_) => NewValueSpec {
            kind: WidgetKind::FreeText,
            enabled: can_edit,
            options: Vec::new(),
            current_value,
        },
        Value::List(_) | Value::Dictionary(_) => NewValueSpec {
            kind: WidgetKind::AddRemovePanel,
            enabled: can_edit,
            options: Vec::new(),
            current_value: String::new(),
        },
        Value::Node(_) => NewValueSpec {
            kind: WidgetKind::Button,
            enabled: true,
            options: Vec::new(),
            current_value,
        },
    };
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, Key, TypeRegistry};
    use crate::model::{CompositeNode, NodeKind, RoleId, Segment};

    fn describe(attribute: &Attribute, window: WindowKind, types: &TypeRegistry) -> PresentationDescriptor {
        let node = CompositeNode::new(NodeKind::Process, "p1");
        let key = Segment::Key(Key::name("Field"));
        let input = PolicyInput {
            attribute,
            key: &key,
            main_node: &node,
            main_role: RoleId::Own,
            current_role: RoleId::Own,
            window,
            editable: attribute.is_editable(),
            types,
        };
        default_policy(&input)
    }

    #[test]
    fn enum_gets_dropdown_of_members() {
        let mut types = TypeRegistry::new();
        types.declare_enum("State", ["Idle", "Busy"]).unwrap();
        let attr = Attribute::new(Value::tag("State", "Busy"));
        let d = describe(&attr, WindowKind::Edit, &types);
        assert_eq!(d.new_value.kind, WidgetKind::Dropdown);
        assert_eq!(d.new_value.options, vec!["Idle", "Busy"]);
        assert_eq!(d.new_value.current_value, "Busy");
        assert_eq!(d.type_text, "State");
        assert_eq!(d.key_text, "Field");
    }

    #[test]
    fn read_only_window_disables_input() {
        let types = TypeRegistry::new();
        let attr = Attribute::new(Value::Int(4));
        let d = describe(&attr, WindowKind::ReadOnly, &types);
        assert_eq!(d.new_value.kind, WidgetKind::FreeText);
        assert!(!d.new_value.enabled);
        assert!(describe(&attr, WindowKind::Debug, &types).new_value.enabled);
    }

    #[test]
    fn non_editable_attribute_is_disabled() {
        let types = TypeRegistry::new();
        let attr = Attribute::new(Value::Bool(true)).read_only();
        let d = describe(&attr, WindowKind::Edit, &types);
        assert_eq!(d.new_value.options, vec!["false", "true"]);
        assert!(!d.new_value.enabled);
    }

    #[test]
    fn containers_and_nodes() {
        let types = TypeRegistry::new();
        let dict = describe(&Attribute::new(Value::dictionary()), WindowKind::Edit, &types);
        assert_eq!(dict.new_value.kind, WidgetKind::AddRemovePanel);
        assert_eq!(dict.existing_value_text, "Dictionary(0)");

        let node = Attribute::new(CompositeNode::new(NodeKind::Channel, "c").into_value());
        let d = describe(&node, WindowKind::ReadOnly, &types);
        assert_eq!(d.new_value.kind, WidgetKind::Button);
        assert!(d.new_value.enabled);
    }

    #[test]
    fn serializes_to_json() {
        let types = TypeRegistry::new();
        let d = describe(&Attribute::new(Value::text("hi")), WindowKind::Edit, &types);
        let json = d.to_json().unwrap();
        assert!(json.contains("\"kind\":\"free_text\""));
        assert!(json.contains("\"status\":\"not_updated\""));
    }
}
