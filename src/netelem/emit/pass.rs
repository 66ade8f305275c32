//! The scan consumer behind [`CodeEmitter`](super::CodeEmitter).
//!
//! Entries are collected bottom-up: every container gets a frame when it
//! opens, its children append their constructor expressions to it, and when
//! it closes the frame turns into generated items plus one expression for
//! the parent frame. Node references switch the target class for their
//! subtree, or are suppressed when that class is already covered.

use std::collections::BTreeMap;

use serde::Serialize;
use stencil::{Casing, Renderer};
use tracing::debug;

use super::templates::{BUILDER, INITIALIZER, KEY_ENUM};
use super::{
    literal, roles_for, Owner, TargetClass, UnitBuffer, MESSAGE_TYPE_KEY, OUTGOING_RESULTS_KEY,
};
use crate::attributes::{Attribute, Key, Value};
use crate::config::EmitConfig;
use crate::error::{ReconciliationInvariantViolation, Result};
use crate::model::{CompositeNode, KeyPath, RoleId, Segment};
use crate::scan::{Consumer, ScanContext, SuppressionStack};

#[derive(Serialize)]
struct MemberData {
    ident: String,
    /// Expression yielding the key text
    text: String,
}

#[derive(Serialize)]
struct KeyEnumData<'a> {
    path: &'a str,
    name: &'a str,
    members: Vec<MemberData>,
}

#[derive(Serialize)]
struct EntryData<'a> {
    key: String,
    attribute: &'a str,
}

#[derive(Serialize)]
struct InitializerData<'a> {
    path: &'a str,
    name: &'a str,
    entries: Vec<EntryData<'a>>,
}

#[derive(Serialize)]
struct BuilderData<'a> {
    tag: String,
    name: &'a str,
    type_key: String,
    tag_value: String,
    init: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct ClassFrame {
    class: TargetClass,
    /// Path length where this class's roles start
    base: usize,
}

/// One child of an open container.
#[derive(Debug)]
struct Entry {
    segment: Option<Segment>,
    attribute: String,
    /// Initializer function, for dictionary-valued entries
    init: Option<String>,
}

#[derive(Debug, Default)]
struct Frame {
    entries: Vec<Entry>,
}

pub(crate) struct EmitPass<'e> {
    config: &'e EmitConfig,
    renderer: &'e Renderer,
    units: &'e mut BTreeMap<TargetClass, UnitBuffer>,
    classes: Vec<ClassFrame>,
    frames: Vec<Frame>,
    suppression: SuppressionStack,
}

impl<'e> EmitPass<'e> {
    pub(crate) fn new(
        config: &'e EmitConfig,
        renderer: &'e Renderer,
        units: &'e mut BTreeMap<TargetClass, UnitBuffer>,
        class: TargetClass,
    ) -> Self {
        units.entry(class).or_default();
        Self {
            config,
            renderer,
            units,
            classes: vec![ClassFrame { class, base: 0 }],
            frames: Vec::new(),
            suppression: SuppressionStack::new(),
        }
    }

    fn is_covered(&self, class: TargetClass) -> bool {
        self.units.contains_key(&class) || self.classes.iter().any(|f| f.class == class)
    }

    fn push_entry(
        &mut self,
        ctx: &ScanContext<'_>,
        attribute: &Attribute,
        value_expr: &str,
        init: Option<String>,
    ) -> Result<()> {
        let frame = self.frames.last_mut().ok_or_else(|| ReconciliationInvariantViolation {
            path: ctx.path.clone(),
            detail: "attribute scanned outside of any role".to_string(),
        })?;
        frame.entries.push(Entry {
            segment: ctx.segment().cloned(),
            attribute: literal::attribute(attribute, value_expr),
            init,
        });
        Ok(())
    }

    fn pop_frame(&mut self, path: &KeyPath) -> Result<Frame> {
        self.frames.pop().ok_or_else(|| {
            ReconciliationInvariantViolation {
                path: path.clone(),
                detail: "container closed without being opened".to_string(),
            }
            .into()
        })
    }

    /// Writes the key enum and initializer of one dictionary (or role) into
    /// the current class's unit. Returns the initializer's name.
    ///
    /// A path already emitted for this class reuses its items. A different
    /// path whose names collide gets numbered names of its own.
    fn emit_dictionary(&mut self, ctx: &ScanContext<'_>, entries: &[Entry]) -> Result<String> {
        let frame = self.classes.last().copied().ok_or_else(|| ReconciliationInvariantViolation {
            path: ctx.path.clone(),
            detail: "no target class for dictionary".to_string(),
        })?;
        let segments = ctx.path.segments();
        let relative = KeyPath::from_segments(segments[frame.base.min(segments.len())..].to_vec());
        let words = literal::path_words(relative.segments());
        let path_text = relative.to_string();
        let outgoing = frame.class == TargetClass::Message
            && matches!(ctx.segment(), Some(Segment::Key(Key::Name(name))) if name == OUTGOING_RESULTS_KEY);

        let renderer = self.renderer;
        let unit = self.units.entry(frame.class).or_default();

        let keyed: Vec<(&Key, &Entry)> = entries
            .iter()
            .filter_map(|entry| match &entry.segment {
                Some(Segment::Key(key)) => Some((key, entry)),
                _ => None,
            })
            .collect();
        let key_exprs: Vec<String> = keyed
            .iter()
            .map(|(key, _)| match key {
                Key::Name(name) => format!("Key::name({})", unit.constant(name)),
                Key::Tag(tag) => format!(
                    "Key::tag({}, {})",
                    literal::string(&tag.enum_type),
                    literal::string(&tag.member)
                ),
            })
            .collect();

        if outgoing {
            debug!(path = %ctx.path, "outgoing results become message builders");
        } else {
            let candidate = format!("{}Key", literal::ident(&words, Casing::Pascal, "Root"));
            let (enum_name, fresh) = unit.item_name(Owner::KeyEnum(relative.clone()), candidate);
            if fresh {
                let mut members: Vec<MemberData> = Vec::new();
                for (key, _) in &keyed {
                    let candidate = literal::ident(key.text(), Casing::Pascal, "Key");
                    let ident = literal::unique(candidate, |n| members.iter().any(|m| m.ident == n));
                    let text = match key {
                        Key::Name(name) => unit.constant(name),
                        Key::Tag(tag) => literal::string(&tag.member),
                    };
                    members.push(MemberData { ident, text });
                }
                let block = renderer.render(
                    KEY_ENUM,
                    &KeyEnumData {
                        path: &path_text,
                        name: &enum_name,
                        members,
                    },
                )?;
                unit.blocks.push(block);
            } else {
                debug!(name = %enum_name, "key enum already emitted");
            }
        }

        let candidate = format!("init_{}", literal::ident(&words, Casing::Snake, "root"));
        let (init_name, fresh) = unit.item_name(Owner::Initializer(relative), candidate);
        if fresh {
            let block = renderer.render(
                INITIALIZER,
                &InitializerData {
                    path: &path_text,
                    name: &init_name,
                    entries: keyed
                        .iter()
                        .zip(key_exprs)
                        .map(|((_, entry), key)| EntryData {
                            key,
                            attribute: &entry.attribute,
                        })
                        .collect(),
                },
            )?;
            unit.blocks.push(block);
        }

        if outgoing {
            for (key, entry) in &keyed {
                let (Key::Tag(tag), Some(init)) = (key, &entry.init) else {
                    debug!(key = %key, "outgoing result is not a tagged dictionary, no builder");
                    continue;
                };
                let candidate = format!("build_{}", literal::ident(&tag.member, Casing::Snake, "message"));
                let (name, fresh) = unit.item_name(Owner::Builder(tag.qualified()), candidate);
                if !fresh {
                    continue;
                }
                let type_key = unit.constant(MESSAGE_TYPE_KEY);
                let tag_value = literal::value(&Value::Enum(tag.clone())).unwrap_or_default();
                let block = renderer.render(
                    BUILDER,
                    &BuilderData {
                        tag: tag.qualified(),
                        name: &name,
                        type_key,
                        tag_value,
                        init,
                    },
                )?;
                unit.blocks.push(block);
            }
        }
        Ok(init_name)
    }
}

impl Consumer for EmitPass<'_> {
    fn should_visit(&self, ctx: &ScanContext<'_>, _attribute: &Attribute) -> bool {
        self.classes
            .last()
            .is_some_and(|frame| roles_for(self.config, frame.class).contains(&ctx.current_role))
    }

    fn on_enter_role(&mut self, _ctx: &ScanContext<'_>) -> Result<()> {
        if !self.suppression.is_active() {
            self.frames.push(Frame::default());
        }
        Ok(())
    }

    fn on_exit_role(&mut self, ctx: &ScanContext<'_>) -> Result<()> {
        if self.suppression.is_active() {
            return Ok(());
        }
        let frame = self.pop_frame(ctx.path)?;
        self.emit_dictionary(ctx, &frame.entries)?;
        Ok(())
    }

    fn on_open(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        if self.suppression.is_active() {
            return Ok(());
        }
        match attribute.value() {
            Value::Node(node) => {
                let class = TargetClass::from(node.kind());
                if self.is_covered(class) {
                    debug!(path = %ctx.path, %class, "class already covered, reference suppressed");
                    self.suppression.push(ctx.path);
                } else {
                    self.units.entry(class).or_default();
                    self.classes.push(ClassFrame {
                        class,
                        base: ctx.path.len(),
                    });
                }
            }
            _ => self.frames.push(Frame::default()),
        }
        Ok(())
    }

    fn on_leaf(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        if self.suppression.is_active() {
            return Ok(());
        }
        let expr = literal::value(attribute.value()).unwrap_or_default();
        self.push_entry(ctx, attribute, &expr, None)
    }

    fn on_close(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        match attribute.value() {
            Value::Node(_) => {
                if self.suppression.pop_if(ctx.path) {
                    // reference kept, content belongs to a covered class
                } else if self.suppression.is_active() {
                    return Ok(());
                } else {
                    self.classes.pop();
                }
                let expr = literal::value(attribute.value()).unwrap_or_default();
                self.push_entry(ctx, attribute, &expr, None)
            }
            Value::Dictionary(_) => {
                if self.suppression.is_active() {
                    return Ok(());
                }
                let frame = self.pop_frame(ctx.path)?;
                let init = self.emit_dictionary(ctx, &frame.entries)?;
                let expr = format!("Value::Dictionary({}(functions)?)", init);
                self.push_entry(ctx, attribute, &expr, Some(init))
            }
            Value::List(_) => {
                if self.suppression.is_active() {
                    return Ok(());
                }
                let frame = self.pop_frame(ctx.path)?;
                let elements: Vec<&str> = frame.entries.iter().map(|e| e.attribute.as_str()).collect();
                let expr = format!(
                    "Value::List(AttributeList::from_attributes(vec![{}]))",
                    elements.join(", ")
                );
                self.push_entry(ctx, attribute, &expr, None)
            }
            _ => Ok(()),
        }
    }

    fn nested_roles(&self, _ctx: &ScanContext<'_>, node: &CompositeNode) -> Vec<RoleId> {
        if self.suppression.is_active() {
            return Vec::new();
        }
        roles_for(self.config, TargetClass::from(node.kind())).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::templates;
    use crate::model::NodeKind;

    #[test]
    fn roles_of_another_class_are_not_visited() {
        let config = EmitConfig {
            class_roles: vec![RoleId::Private],
            message_roles: vec![RoleId::OperationResults],
            ..EmitConfig::new("Leader election", "Chang Roberts")
        };
        let renderer = templates::renderer().unwrap();
        let mut node = CompositeNode::new(NodeKind::Process, "p1");
        node.role_mut(RoleId::OperationResults)
            .add(Key::name("Outbox"), Attribute::new(Value::Int(1)))
            .unwrap();

        let mut units = BTreeMap::new();
        {
            let mut pass = EmitPass::new(&config, &renderer, &mut units, TargetClass::Process);
            node.scan(&mut pass, RoleId::OperationResults, RoleId::OperationResults)
                .unwrap();
        }
        let unit = &units[&TargetClass::Process];
        assert!(unit.constants.is_empty());
        assert!(unit.blocks.iter().all(|block| !block.contains("Outbox")));
    }
}
