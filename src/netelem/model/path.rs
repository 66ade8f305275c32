//! Addressing attributes inside a node tree.
//!
//! A [`KeyPath`] is a sequence of segments read from a root node downwards:
//!
//! ```text
//! Role -> (Key | Element)* -> [Role -> (Key | Element)*]...
//! ```
//!
//! A `Key` segment selects a dictionary entry, an `Element` segment selects a
//! list element by its stable identity, and a `Role` segment either starts the
//! path or steps into the node held by the preceding attribute.

use std::fmt;

use super::{CompositeNode, RoleId};
use crate::attributes::{Attribute, AttributeDictionary, AttributeList, ElementId, Key, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Role(RoleId),
    Key(Key),
    Element(ElementId),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Role(role) => write!(f, "{}", role),
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Element(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(Vec<Segment>);

impl KeyPath {
    /// The empty path, naming the root node itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// A new path one segment longer.
    pub fn child(&self, segment: Segment) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn parent(&self) -> Option<KeyPath> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join("/"))
    }
}

/// An attribute found by path, together with what owns it.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    /// The innermost node whose role holds the attribute (directly or nested)
    pub host: &'a CompositeNode,
    /// The container attribute directly holding it; `None` for role entries
    pub parent: Option<&'a Attribute>,
    pub attribute: &'a Attribute,
}

#[derive(Debug, Clone, Copy)]
pub enum ContainerRef<'a> {
    Dict(&'a AttributeDictionary),
    List(&'a AttributeList),
}

impl<'a> ContainerRef<'a> {
    pub fn child(self, segment: &Segment) -> Option<&'a Attribute> {
        match (self, segment) {
            (ContainerRef::Dict(dict), Segment::Key(key)) => dict.get(key),
            (ContainerRef::List(list), Segment::Element(id)) => list.get_by_identity(*id),
            _ => None,
        }
    }

    pub fn len(self) -> usize {
        match self {
            ContainerRef::Dict(dict) => dict.len(),
            ContainerRef::List(list) => list.len(),
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Child segments in iteration order.
    pub fn segments(self) -> Vec<Segment> {
        match self {
            ContainerRef::Dict(dict) => dict.keys().cloned().map(Segment::Key).collect(),
            ContainerRef::List(list) => list
                .iter()
                .filter_map(|a| a.identity())
                .map(Segment::Element)
                .collect(),
        }
    }
}

#[derive(Debug)]
pub enum ContainerMut<'a> {
    Dict(&'a mut AttributeDictionary),
    List(&'a mut AttributeList),
}

impl<'a> ContainerMut<'a> {
    pub fn into_child(self, segment: &Segment) -> Option<&'a mut Attribute> {
        match (self, segment) {
            (ContainerMut::Dict(dict), Segment::Key(key)) => dict.get_mut(key),
            (ContainerMut::List(list), Segment::Element(id)) => list.get_by_identity_mut(*id),
            _ => None,
        }
    }

    /// Removes the child a segment names.
    pub fn remove(self, segment: &Segment) -> Option<Attribute> {
        match (self, segment) {
            (ContainerMut::Dict(dict), Segment::Key(key)) => dict.remove(key),
            (ContainerMut::List(list), Segment::Element(id)) => list.remove_by_identity(*id),
            _ => None,
        }
    }
}

enum Cursor<'a> {
    Node(&'a CompositeNode),
    Container {
        host: &'a CompositeNode,
        holder: Option<&'a Attribute>,
        container: ContainerRef<'a>,
    },
    Attribute(Located<'a>),
}

impl<'a> Cursor<'a> {
    fn step(self, segment: &Segment) -> Option<Cursor<'a>> {
        match (self, segment) {
            (Cursor::Node(node), Segment::Role(role)) => Some(Cursor::Container {
                host: node,
                holder: None,
                container: ContainerRef::Dict(node.role(*role)),
            }),
            (Cursor::Attribute(found), Segment::Role(role)) => {
                let node = found.attribute.node()?;
                Some(Cursor::Container {
                    host: node,
                    holder: None,
                    container: ContainerRef::Dict(node.role(*role)),
                })
            }
            (Cursor::Attribute(found), segment) => {
                let container = container_of(found.attribute)?;
                Cursor::Container {
                    host: found.host,
                    holder: Some(found.attribute),
                    container,
                }
                .step(segment)
            }
            (
                Cursor::Container {
                    host,
                    holder,
                    container,
                },
                segment,
            ) => {
                let attribute = container.child(segment)?;
                Some(Cursor::Attribute(Located {
                    host,
                    parent: holder,
                    attribute,
                }))
            }
            (Cursor::Node(_), _) => None,
        }
    }
}

fn container_of(attribute: &Attribute) -> Option<ContainerRef<'_>> {
    match attribute.value() {
        Value::Dictionary(dict) => Some(ContainerRef::Dict(dict)),
        Value::List(list) => Some(ContainerRef::List(list)),
        _ => None,
    }
}

impl CompositeNode {
    fn walk(&self, path: &KeyPath) -> Option<Cursor<'_>> {
        path.segments()
            .iter()
            .try_fold(Cursor::Node(self), |cursor, segment| cursor.step(segment))
    }

    /// Finds the attribute a path ends at.
    pub fn locate(&self, path: &KeyPath) -> Option<Located<'_>> {
        match self.walk(path)? {
            Cursor::Attribute(found) => Some(found),
            _ => None,
        }
    }

    /// Finds the container a path denotes: a role (path ends in a role
    /// segment) or a dictionary/list attribute.
    pub fn container(&self, path: &KeyPath) -> Option<ContainerRef<'_>> {
        match self.walk(path)? {
            Cursor::Container { container, .. } => Some(container),
            Cursor::Attribute(found) => container_of(found.attribute),
            Cursor::Node(_) => None,
        }
    }

    /// The node a path denotes: the root for the empty path, otherwise a
    /// node-reference attribute.
    pub fn node_at(&self, path: &KeyPath) -> Option<&CompositeNode> {
        match self.walk(path)? {
            Cursor::Node(node) => Some(node),
            Cursor::Attribute(found) => found.attribute.node(),
            Cursor::Container { .. } => None,
        }
    }

    pub fn attribute_mut(&mut self, path: &KeyPath) -> Option<&mut Attribute> {
        let (last, init) = path.segments().split_last()?;
        self.container_mut_at(init)?.into_child(last)
    }

    pub fn container_mut(&mut self, path: &KeyPath) -> Option<ContainerMut<'_>> {
        self.container_mut_at(path.segments())
    }

    fn container_mut_at(&mut self, segments: &[Segment]) -> Option<ContainerMut<'_>> {
        let (first, rest) = segments.split_first()?;
        let Segment::Role(role) = first else {
            return None;
        };
        let mut current = ContainerMut::Dict(self.role_mut(*role));
        let mut iter = rest.iter();
        while let Some(segment) = iter.next() {
            let attribute = current.into_child(segment)?;
            current = match attribute.value_mut() {
                Value::Dictionary(dict) => ContainerMut::Dict(dict),
                Value::List(list) => ContainerMut::List(list),
                Value::Node(node) => match iter.next()? {
                    Segment::Role(role) => ContainerMut::Dict(node.role_mut(*role)),
                    _ => return None,
                },
                _ => return None,
            };
        }
        Some(current)
    }
}
