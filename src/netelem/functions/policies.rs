//! Built-in presentation policies.

use super::{PolicyFn, PolicyInput};
use crate::presentation::{default_policy, NewValueSpec, PresentationDescriptor, WidgetKind};

pub const IDENTITY: &str = "identity";

pub const BUILTINS: &[(&str, PolicyFn)] = &[
    (IDENTITY, identity),
    ("read_only", read_only),
    ("free_text", free_text),
];

/// Control chosen from the attribute's category.
pub fn identity(input: &PolicyInput<'_>) -> PresentationDescriptor {
    default_policy(input)
}

/// Shows the value but never offers an input.
pub fn read_only(input: &PolicyInput<'_>) -> PresentationDescriptor {
    PresentationDescriptor::display_only(input)
}

/// Free text for any textual value, including enums and booleans.
pub fn free_text(input: &PolicyInput<'_>) -> PresentationDescriptor {
    if !input.attribute.type_handle().is_textual() {
        return default_policy(input);
    }
    let mut descriptor = PresentationDescriptor::display_only(input);
    descriptor.new_value = NewValueSpec {
        kind: WidgetKind::FreeText,
        enabled: input.editable && input.window.allows_editing(),
        options: Vec::new(),
        current_value: input.attribute.value().to_string(),
    };
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, Key, TypeRegistry, Value};
    use crate::model::{CompositeNode, NodeKind, RoleId, Segment};
    use crate::presentation::WindowKind;

    fn apply(policy: PolicyFn, attribute: &Attribute) -> PresentationDescriptor {
        let node = CompositeNode::new(NodeKind::Message, "m");
        let key = Segment::Key(Key::name("K"));
        let mut types = TypeRegistry::new();
        types.declare_enum("Kind", ["A", "B"]).unwrap();
        policy(&PolicyInput {
            attribute,
            key: &key,
            main_node: &node,
            main_role: RoleId::Private,
            current_role: RoleId::Private,
            window: WindowKind::Edit,
            editable: true,
            types: &types,
        })
    }

    #[test]
    fn read_only_has_no_control() {
        let d = apply(read_only, &Attribute::new(Value::Int(3)));
        assert_eq!(d.new_value.kind, WidgetKind::None);
        assert_eq!(d.existing_value_text, "3");
    }

    #[test]
    fn free_text_overrides_dropdown() {
        let d = apply(free_text, &Attribute::new(Value::tag("Kind", "B")));
        assert_eq!(d.new_value.kind, WidgetKind::FreeText);
        assert_eq!(d.new_value.current_value, "B");
        assert!(d.new_value.enabled);
    }

    #[test]
    fn free_text_leaves_containers_alone() {
        let d = apply(free_text, &Attribute::new(Value::list()));
        assert_eq!(d.new_value.kind, WidgetKind::AddRemovePanel);
    }

    #[test]
    fn identity_matches_default() {
        let attr = Attribute::new(Value::tag("Kind", "A"));
        assert_eq!(apply(identity, &attr).new_value.options, vec!["A", "B"]);
    }
}
