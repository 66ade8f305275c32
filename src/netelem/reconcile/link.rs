//! Links and the arena that holds them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::{Attribute, Category, TypeHandle};
use crate::model::{KeyPath, RoleId, Segment};

/// Index of a link in its [`LinkTree`]. Only meaningful for the tree (and
/// session) that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub(crate) usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a link stands relative to the node it mirrors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Mirrors the node as is
    #[default]
    NotUpdated,
    /// Holds an edited value not yet committed
    Updated,
    /// Holds a new attribute not yet committed
    Added,
    /// Marked for deletion on commit
    Removed,
}

impl LinkStatus {
    pub fn is_pending(self) -> bool {
        self != LinkStatus::NotUpdated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// The scanned node itself
    Root,
    /// A role of the root node or of a referenced node
    Role(RoleId),
    /// An attribute
    Attribute,
}

/// Bookkeeping record binding one attribute to its presentation state.
///
/// Links never point into the attribute tree. A link knows its attribute by
/// [`KeyPath`] and its parent by [`LinkId`].
#[derive(Debug, Clone)]
pub struct Link {
    pub(crate) id: LinkId,
    pub(crate) kind: LinkKind,
    pub(crate) path: KeyPath,
    pub(crate) parent: Option<LinkId>,
    pub(crate) children: Vec<LinkId>,
    pub(crate) position_in_parent: usize,
    pub(crate) status: LinkStatus,
    pub(crate) previous_status: LinkStatus,
    /// Previous statuses saved by nested removals, innermost last
    pub(crate) removal_stash: Vec<LinkStatus>,
    pub(crate) visited: bool,
    pub(crate) last_committed_text: String,
    pub(crate) pending_text: Option<String>,
    /// The attribute of an `Added` link, until commit inserts it
    pub(crate) pending_attribute: Option<Attribute>,
    pub(crate) existing_value_changed: bool,
    pub(crate) contains_changes: bool,
    pub(crate) emphasized: bool,
    pub(crate) category: Option<Category>,
    pub(crate) type_handle: Option<TypeHandle>,
    pub(crate) editable: bool,
    pub(crate) main_role: Option<RoleId>,
    pub(crate) current_role: Option<RoleId>,
}

impl Link {
    pub(crate) fn new(kind: LinkKind, path: KeyPath, parent: Option<LinkId>) -> Self {
        Self {
            id: LinkId(0),
            kind,
            path,
            parent,
            children: Vec::new(),
            position_in_parent: 0,
            status: LinkStatus::NotUpdated,
            previous_status: LinkStatus::NotUpdated,
            removal_stash: Vec::new(),
            visited: false,
            last_committed_text: String::new(),
            pending_text: None,
            pending_attribute: None,
            existing_value_changed: false,
            contains_changes: false,
            emphasized: false,
            category: None,
            type_handle: None,
            editable: false,
            main_role: None,
            current_role: None,
        }
    }

    /// Copies what the link mirrors from an attribute.
    pub(crate) fn describe(&mut self, attribute: &Attribute) {
        self.category = Some(attribute.category());
        self.type_handle = Some(attribute.type_handle());
        self.editable = attribute.is_editable();
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// The key or element id of the attribute, or the role.
    pub fn segment(&self) -> Option<&Segment> {
        self.path.last()
    }

    pub fn parent(&self) -> Option<LinkId> {
        self.parent
    }

    pub fn children(&self) -> &[LinkId] {
        &self.children
    }

    pub fn position_in_parent(&self) -> usize {
        self.position_in_parent
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn previous_status(&self) -> LinkStatus {
        self.previous_status
    }

    pub fn was_visited(&self) -> bool {
        self.visited
    }

    pub fn last_committed_text(&self) -> &str {
        &self.last_committed_text
    }

    pub fn pending_text(&self) -> Option<&str> {
        self.pending_text.as_deref()
    }

    pub fn pending_attribute(&self) -> Option<&Attribute> {
        self.pending_attribute.as_ref()
    }

    pub fn existing_value_changed(&self) -> bool {
        self.existing_value_changed
    }

    pub fn contains_changes(&self) -> bool {
        self.contains_changes
    }

    pub fn is_emphasized(&self) -> bool {
        self.emphasized
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn type_handle(&self) -> Option<&TypeHandle> {
        self.type_handle.as_ref()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn main_role(&self) -> Option<RoleId> {
        self.main_role
    }

    pub fn current_role(&self) -> Option<RoleId> {
        self.current_role
    }

    /// Whether new children can be added under this link.
    pub fn is_container(&self) -> bool {
        match self.kind {
            LinkKind::Role(_) => true,
            LinkKind::Attribute => matches!(
                self.category,
                Some(Category::AttributeDictionary) | Some(Category::AttributeList)
            ),
            LinkKind::Root => false,
        }
    }
}

/// Arena of links with a path index.
#[derive(Debug, Clone)]
pub struct LinkTree {
    links: Vec<Option<Link>>,
    index: HashMap<KeyPath, LinkId>,
    root: LinkId,
}

impl Default for LinkTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTree {
    pub fn new() -> Self {
        let mut tree = Self {
            links: Vec::new(),
            index: HashMap::new(),
            root: LinkId(0),
        };
        tree.root = tree.insert(Link::new(LinkKind::Root, KeyPath::root(), None));
        tree
    }

    pub fn root(&self) -> LinkId {
        self.root
    }

    pub fn get(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn find(&self, path: &KeyPath) -> Option<LinkId> {
        self.index.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn insert(&mut self, mut link: Link) -> LinkId {
        let id = LinkId(self.links.len());
        link.id = id;
        self.index.insert(link.path.clone(), id);
        self.links.push(Some(link));
        id
    }

    /// Removes a link and its whole subtree. Returns how many links went away.
    ///
    /// The parent's child list is left to the caller.
    pub(crate) fn remove_subtree(&mut self, id: LinkId) -> usize {
        let Some(link) = self.links.get_mut(id.0).and_then(|slot| slot.take()) else {
            return 0;
        };
        self.index.remove(&link.path);
        1 + link
            .children
            .iter()
            .map(|child| self.remove_subtree(*child))
            .sum::<usize>()
    }

    /// Ids of a link and all its descendants, pre-order.
    pub fn subtree(&self, id: LinkId) -> Vec<LinkId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(link) = self.get(current) {
                out.push(current);
                stack.extend(link.children.iter().rev().copied());
            }
        }
        out
    }

    /// True if any strict descendant of `id` has a pending status.
    pub fn subtree_has_pending(&self, id: LinkId) -> bool {
        self.subtree(id)
            .into_iter()
            .skip(1)
            .filter_map(|d| self.get(d))
            .any(|link| link.status.is_pending())
    }

    pub(crate) fn set_children(&mut self, parent: LinkId, children: Vec<LinkId>) {
        for (position, child) in children.iter().enumerate() {
            if let Some(link) = self.get_mut(*child) {
                link.position_in_parent = position;
            }
        }
        if let Some(link) = self.get_mut(parent) {
            link.children = children;
        }
    }

    /// Every live link, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter_map(|slot| slot.as_ref())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.iter_mut().filter_map(|slot| slot.as_mut())
    }
}
