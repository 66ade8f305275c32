//! # Code Emission
//!
//! [`CodeEmitter`] scans composite nodes and produces Rust source that
//! rebuilds their baseline attributes through this crate's API. Output is
//! grouped by [`TargetClass`], one [`GeneratedUnit`] per class.
//!
//! For every dictionary (and every scanned role) a unit gets:
//!
//! - a `{Path}Key` enum with one member per key, in key order, and a
//!   `key_name()` accessor
//! - an `init_{path}(functions)` function returning the populated dictionary,
//!   or the first duplicate key it met
//!
//! Plain-name keys become `&str` constants, emitted once per unit however
//! many dictionaries use them. In the message class the dictionary keyed
//! [`OUTGOING_RESULTS_KEY`] yields one `build_{tag}` function per tagged
//! entry instead of a key enum.
//!
//! ## Classes
//!
//! A node reference switches the target class for its subtree. When the
//! referenced class is already covered (it has a unit, or is being emitted
//! further up) the reference is kept as a plain node value and its content
//! is suppressed.
//!
//! ## Determinism
//!
//! Units are ordered by class; items inside a unit follow scan order, which
//! follows key order. Identical trees give byte-identical text.
//!
//! Nothing here touches the filesystem; writing units out is up to the host.

mod literal;
mod pass;
mod templates;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use stencil::{Casing, Renderer};
use tracing::{debug, info};

use crate::config::EmitConfig;
use crate::error::Result;
use crate::model::{CompositeNode, KeyPath, NodeKind, RoleId};
use pass::EmitPass;

/// Key of the message dictionary whose tagged entries become builders.
pub const OUTGOING_RESULTS_KEY: &str = "OutgoingResults";

/// Own-role key the builders stamp with the message tag.
pub const MESSAGE_TYPE_KEY: &str = "MessageType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetClass {
    Network,
    Process,
    Channel,
    Message,
}

impl From<NodeKind> for TargetClass {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Network => TargetClass::Network,
            NodeKind::Process => TargetClass::Process,
            NodeKind::Channel => TargetClass::Channel,
            NodeKind::Message => TargetClass::Message,
        }
    }
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetClass::Network => "Network",
            TargetClass::Process => "Process",
            TargetClass::Channel => "Channel",
            TargetClass::Message => "Message",
        };
        f.write_str(name)
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedUnit {
    pub class: TargetClass,
    pub file_name: String,
    pub text: String,
}

#[derive(Serialize)]
struct Constant {
    name: String,
    text: String,
}

/// What a generated item was emitted for, relative to its class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Owner {
    KeyEnum(KeyPath),
    Initializer(KeyPath),
    /// Qualified message tag
    Builder(String),
}

/// Text accumulated for one class.
#[derive(Default, Clone)]
pub(crate) struct UnitBuffer {
    /// `(name, text)` in first-use order
    constants: Vec<(String, String)>,
    by_text: HashMap<String, String>,
    /// Every item name in the unit
    items: BTreeSet<String>,
    owned: HashMap<Owner, String>,
    blocks: Vec<String>,
}

impl UnitBuffer {
    /// The constant holding `text`, declared on first use.
    fn constant(&mut self, text: &str) -> String {
        if let Some(name) = self.by_text.get(text) {
            return name.clone();
        }
        let candidate = literal::ident(text, Casing::Screaming, "KEY");
        let name = literal::unique(candidate, |n| self.items.contains(n));
        self.items.insert(name.clone());
        self.by_text.insert(text.to_string(), name.clone());
        self.constants.push((name.clone(), text.to_string()));
        name
    }

    /// The item name for `owner`, and whether it was just reserved.
    ///
    /// An owner keeps the name it got first. A different owner whose
    /// candidate is taken gets a numbered variant.
    fn item_name(&mut self, owner: Owner, candidate: String) -> (String, bool) {
        if let Some(name) = self.owned.get(&owner) {
            return (name.clone(), false);
        }
        let name = literal::unique(candidate.clone(), |n| self.items.contains(n));
        if name != candidate {
            debug!(taken = %candidate, renamed = %name, "item name collision");
        }
        self.items.insert(name.clone());
        self.owned.insert(owner, name.clone());
        (name, true)
    }
}

fn roles_for(config: &EmitConfig, class: TargetClass) -> &[RoleId] {
    match class {
        TargetClass::Message => &config.message_roles,
        _ => &config.class_roles,
    }
}

#[derive(Serialize)]
struct HeaderData<'a> {
    algorithm: &'a str,
    subject: &'a str,
    class: String,
    crate_path: &'a str,
}

pub struct CodeEmitter {
    config: EmitConfig,
    renderer: Renderer,
    units: BTreeMap<TargetClass, UnitBuffer>,
}

impl CodeEmitter {
    pub fn new(config: EmitConfig) -> Result<Self> {
        Ok(Self {
            config,
            renderer: templates::renderer()?,
            units: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &EmitConfig {
        &self.config
    }

    /// Classes with a unit so far.
    pub fn classes(&self) -> Vec<TargetClass> {
        self.units.keys().copied().collect()
    }

    /// Scans the emitted roles of `node` into its class's unit.
    ///
    /// Items already emitted for the same path are kept as they are. On
    /// error no unit changes.
    pub fn emit_node(&mut self, node: &CompositeNode) -> Result<()> {
        let class = TargetClass::from(node.kind());
        let mut units = self.units.clone();
        {
            let mut pass = EmitPass::new(&self.config, &self.renderer, &mut units, class);
            for role in roles_for(&self.config, class) {
                if role.is_backup() {
                    continue;
                }
                node.scan(&mut pass, *role, *role)?;
            }
        }
        self.units = units;
        debug!(node = node.name(), %class, "node emitted");
        Ok(())
    }

    /// Renders every unit, ordered by class.
    pub fn finish(self) -> Result<Vec<GeneratedUnit>> {
        let mut out = Vec::with_capacity(self.units.len());
        for (class, unit) in &self.units {
            let header = self.renderer.render(
                templates::HEADER,
                &HeaderData {
                    algorithm: &self.config.algorithm,
                    subject: &self.config.subject,
                    class: class.to_string(),
                    crate_path: &self.config.crate_path,
                },
            )?;
            let constants: Vec<Constant> = unit
                .constants
                .iter()
                .map(|(name, text)| Constant {
                    name: name.clone(),
                    text: text.clone(),
                })
                .collect();

            let mut text = header;
            text.push('\n');
            if !constants.is_empty() {
                text.push_str(&self.renderer.render(
                    templates::CONSTANTS,
                    &serde_json::json!({ "constants": constants }),
                )?);
                text.push('\n');
            }
            for block in &unit.blocks {
                text.push_str(block);
                text.push('\n');
            }
            text.push_str(&self.renderer.render(
                templates::FOOTER,
                &serde_json::json!({ "class": class.to_string() }),
            )?);

            let file_name = self.file_name(*class);
            info!(
                %class,
                file = %file_name,
                constants = unit.constants.len(),
                items = unit.blocks.len(),
                "unit generated"
            );
            out.push(GeneratedUnit {
                class: *class,
                file_name,
                text,
            });
        }
        Ok(out)
    }

    fn file_name(&self, class: TargetClass) -> String {
        let class_part = Casing::Snake.apply(&class.to_string());
        if self.config.algorithm.trim().is_empty() {
            format!("{}.rs", class_part)
        } else {
            format!(
                "{}_{}.rs",
                literal::ident(&self.config.algorithm, Casing::Snake, "unit"),
                class_part
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, AttributeDictionary, Key, Value};
    use pretty_assertions::assert_eq;

    fn config(class_roles: Vec<RoleId>) -> EmitConfig {
        EmitConfig {
            class_roles,
            ..EmitConfig::new("Leader election", "Chang Roberts")
        }
    }

    fn emit(config: EmitConfig, nodes: &[&CompositeNode]) -> Vec<GeneratedUnit> {
        let mut emitter = CodeEmitter::new(config).unwrap();
        for node in nodes {
            emitter.emit_node(node).unwrap();
        }
        emitter.finish().unwrap()
    }

    #[test]
    fn single_role_layout() {
        let mut node = CompositeNode::new(NodeKind::Process, "p1");
        node.role_mut(RoleId::Private)
            .add(Key::name("Round"), Attribute::new(Value::Int(3)).read_only())
            .unwrap();

        let units = emit(config(vec![RoleId::Private]), &[&node]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].file_name, "chang_roberts_process.rs");

        let expected = r#"// Chang Roberts: Leader election
// Process attributes, generated by netelem. Regenerate instead of editing.
#![allow(dead_code, unused_mut, unused_variables)]

use netelem::attributes::{Attribute, AttributeDictionary, AttributeList, Key, Value};
use netelem::error::DuplicateKeyError;
use netelem::functions::FunctionRegistry;
use netelem::model::{CompositeNode, NodeKind, RoleId};

pub const ROUND: &str = "Round";

/// Keys of `private`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivateKey {
    Round,
}

impl PrivateKey {
    pub fn key_name(self) -> &'static str {
        match self {
            PrivateKey::Round => ROUND,
        }
    }
}

/// Baseline content of `private`
pub fn init_private(functions: &FunctionRegistry) -> Result<AttributeDictionary, DuplicateKeyError> {
    let mut dict = AttributeDictionary::new();
    dict.add(Key::name(ROUND), Attribute::new(Value::Int(3)).read_only())?;
    Ok(dict)
}

// End of generated Process attributes.
"#;
        assert_eq!(units[0].text, expected);
    }

    #[test]
    fn nested_dictionaries_are_initialized_bottom_up() {
        let mut node = CompositeNode::new(NodeKind::Process, "p1");
        let mut config_dict = AttributeDictionary::new();
        config_dict
            .add(Key::name("Timeout"), Attribute::new(Value::Float(1.5)))
            .unwrap();
        node.role_mut(RoleId::Private)
            .add(Key::name("Config"), Attribute::new(Value::Dictionary(config_dict)))
            .unwrap();

        let text = &emit(config(vec![RoleId::Private]), &[&node])[0].text;
        let inner = text.find("pub fn init_private_config").unwrap();
        let outer = text.find("pub fn init_private(").unwrap();
        assert!(inner < outer);
        assert!(text.contains("pub enum PrivateConfigKey {\n    Timeout,\n}"));
        assert!(text.contains(
            "dict.add(Key::name(CONFIG), Attribute::new(Value::Dictionary(init_private_config(functions)?)))?;"
        ));
    }

    #[test]
    fn shared_key_becomes_one_constant() {
        let mut node = CompositeNode::new(NodeKind::Process, "p1");
        for name in ["Left", "Right"] {
            let mut dict = AttributeDictionary::new();
            dict.add(Key::name("Foo"), Attribute::new(Value::Int(1))).unwrap();
            node.role_mut(RoleId::Private)
                .add(Key::name(name), Attribute::new(Value::Dictionary(dict)))
                .unwrap();
        }
        let text = &emit(config(vec![RoleId::Private]), &[&node])[0].text;
        assert_eq!(text.matches("pub const FOO: &str").count(), 1);
        assert_eq!(text.matches("Key::name(FOO)").count(), 2);
    }

    #[test]
    fn covered_class_reference_is_suppressed() {
        let mut peer = CompositeNode::new(NodeKind::Process, "p2");
        peer.role_mut(RoleId::Private)
            .add(Key::name("Secret"), Attribute::new(Value::Int(9)))
            .unwrap();
        let mut node = CompositeNode::new(NodeKind::Process, "p1");
        node.role_mut(RoleId::Private)
            .add(Key::name("Peer"), Attribute::new(peer.into_value()))
            .unwrap();

        let units = emit(config(vec![RoleId::Private]), &[&node]);
        assert_eq!(units.len(), 1);
        let text = &units[0].text;
        assert!(!text.contains("SECRET"));
        assert!(text.contains(r#"Value::node(CompositeNode::new(NodeKind::Process, "p2"))"#));
    }

    #[test]
    fn reference_to_new_class_opens_its_unit() {
        let mut channel = CompositeNode::new(NodeKind::Channel, "c1");
        channel
            .role_mut(RoleId::Private)
            .add(Key::name("Delay"), Attribute::new(Value::Int(2)))
            .unwrap();
        let mut node = CompositeNode::new(NodeKind::Process, "p1");
        node.role_mut(RoleId::Private)
            .add(Key::name("Out"), Attribute::new(channel.into_value()))
            .unwrap();

        let units = emit(config(vec![RoleId::Private]), &[&node]);
        let classes: Vec<TargetClass> = units.iter().map(|u| u.class).collect();
        assert_eq!(classes, vec![TargetClass::Process, TargetClass::Channel]);
        assert!(units[1].text.contains("pub fn init_private(functions"));
        assert!(units[1].text.contains("Key::name(DELAY)"));
        assert!(!units[0].text.contains("DELAY"));
    }

    #[test]
    fn outgoing_results_become_builders() {
        let mut ping = AttributeDictionary::new();
        ping.add(Key::name("Hops"), Attribute::new(Value::Int(0))).unwrap();
        let mut outgoing = AttributeDictionary::new();
        outgoing
            .add(Key::tag("MessageKind", "Ping"), Attribute::new(Value::Dictionary(ping)))
            .unwrap();
        let mut message = CompositeNode::new(NodeKind::Message, "m");
        message
            .role_mut(RoleId::OperationResults)
            .add(
                Key::name(OUTGOING_RESULTS_KEY),
                Attribute::new(Value::Dictionary(outgoing)),
            )
            .unwrap();

        let text = &emit(EmitConfig::default(), &[&message])[0].text;
        assert!(text.contains("pub fn build_ping(name: &str, functions: &FunctionRegistry) -> Result<CompositeNode, DuplicateKeyError> {"));
        assert!(text.contains(
            "node.set_role(RoleId::OperationResults, init_operation_results_outgoing_results_ping(functions)?);"
        ));
        assert!(text.contains(r#"Attribute::new(Value::tag("MessageKind", "Ping")).read_only()"#));
        assert!(text.contains("pub const MESSAGE_TYPE: &str = \"MessageType\";"));
        assert!(!text.contains("pub enum OperationResultsOutgoingResultsKey"));
    }

    #[test]
    fn repeated_nodes_do_not_duplicate_items() {
        let mut a = CompositeNode::new(NodeKind::Process, "p1");
        a.role_mut(RoleId::Private)
            .add(Key::name("Round"), Attribute::new(Value::Int(1)))
            .unwrap();
        let b = a.duplicate();
        let text = &emit(config(vec![RoleId::Private]), &[&a, &b])[0].text;
        assert_eq!(text.matches("pub enum PrivateKey").count(), 1);
        assert_eq!(text.matches("pub fn init_private(").count(), 1);
    }

    #[test]
    fn file_name_without_algorithm() {
        let node = CompositeNode::new(NodeKind::Network, "n");
        let units = emit(EmitConfig::default(), &[&node]);
        assert_eq!(units[0].file_name, "network.rs");
    }
}
