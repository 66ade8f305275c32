#![allow(dead_code)]

use netelem::attributes::{Attribute, AttributeDictionary, AttributeList, Key, TypeRegistry, Value};
use netelem::functions::FunctionRegistry;
use netelem::model::{CompositeNode, KeyPath, NodeKind, RoleId, Segment};

pub fn types() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    types.declare_enum("State", ["Idle", "Candidate", "Leader"]).unwrap();
    types.declare_enum("MessageKind", ["Elect", "Elected"]).unwrap();
    types
}

pub fn dict(entries: Vec<(&str, Value)>) -> AttributeDictionary {
    let mut dict = AttributeDictionary::new();
    for (key, value) in entries {
        dict.add(Key::name(key), Attribute::new(value)).unwrap();
    }
    dict
}

/// A process with something of every category in its roles.
pub fn process(name: &str, functions: &FunctionRegistry) -> CompositeNode {
    let mut node = CompositeNode::new(NodeKind::Process, name);

    let own = node.role_mut(RoleId::Own);
    own.add(
        Key::name("State"),
        Attribute::new(Value::tag("State", "Idle")).in_summary(),
    )
    .unwrap();
    own.add(
        Key::name("Round"),
        Attribute::new(Value::Int(1)).with_validator(functions.validator("positive")),
    )
    .unwrap();

    let config = dict(vec![
        ("A", Value::Int(1)),
        ("B", Value::Bool(true)),
        ("C", Value::text("c")),
    ]);
    let neighbours = AttributeList::from_attributes(vec![
        Attribute::new(Value::text("p2")),
        Attribute::new(Value::text("p3")),
    ]);
    let private = node.role_mut(RoleId::Private);
    private
        .add(Key::name("Config"), Attribute::new(Value::Dictionary(config)))
        .unwrap();
    private
        .add(Key::name("Neighbours"), Attribute::new(Value::List(neighbours)))
        .unwrap();
    private
        .add(
            Key::name("Probability"),
            Attribute::new(Value::Float(0.25)).with_validator(functions.validator("probability")),
        )
        .unwrap();

    node.role_mut(RoleId::OperationResults)
        .add(Key::name("Elected"), Attribute::new(Value::Bool(false)))
        .unwrap();
    node
}

pub fn path(role: RoleId, keys: &[&str]) -> KeyPath {
    let mut path = KeyPath::from_segments(vec![Segment::Role(role)]);
    for key in keys {
        path.push(Segment::Key(Key::name(*key)));
    }
    path
}
