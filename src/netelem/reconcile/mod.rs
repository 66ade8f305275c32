//! # Reconciliation Engine
//!
//! A [`Session`] keeps a tree of [`Link`]s mirroring one [`CompositeNode`]
//! and brings it back in sync after every scan, while holding the user's
//! pending edits.
//!
//! ## Identity
//!
//! A link is identified by the [`KeyPath`] of its attribute. Dictionary entries
//! are matched by key and list elements by their stable [`ElementId`], so a
//! moved element keeps its link.
//!
//! ## Statuses
//!
//! | Status | Meaning | On commit |
//! |--------|---------|-----------|
//! | `NotUpdated` | mirrors the node | nothing |
//! | `Updated` | edited text pending | parsed and written back |
//! | `Added` | new attribute pending | inserted at its position |
//! | `Removed` | marked for deletion | removed from its container |
//!
//! ## Atomicity
//!
//! [`Session::refresh`] works on a copy of the link tree and only swaps it in
//! when the pass succeeds. [`Session::commit`] checks that every pending link
//! is still reachable before touching the node, applies what it can, and
//! rebuilds the tree from scratch.
//!
//! [`ElementId`]: crate::attributes::ElementId

mod commit;
mod link;
mod pass;

pub use commit::{CommitFailure, CommitReport};
pub use link::{Link, LinkId, LinkKind, LinkStatus, LinkTree};
pub use pass::PassReport;

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::attributes::{Attribute, ElementId, Key, TypeRegistry};
use crate::config::SessionConfig;
use crate::error::{
    DuplicateKeyError, Error, ReconciliationInvariantViolation, Result, ValidationError,
};
use crate::functions::{FunctionRegistry, PolicyInput, ValidationContext};
use crate::model::{CompositeNode, ContainerRef, KeyPath, Located, RoleId, Segment};
use crate::presentation::{PresentationDescriptor, WindowKind};

/// What a session scans and how it presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub roles: Vec<RoleId>,
    pub window: WindowKind,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            roles: RoleId::SCANNABLE.to_vec(),
            window: WindowKind::Edit,
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            roles: config.roles.clone(),
            window: config.window,
        }
    }
}

/// An open editing session over one node.
#[derive(Debug, Clone)]
pub struct Session {
    node_id: Uuid,
    options: SessionOptions,
    tree: LinkTree,
    /// Next interactive element id handed out per list, for uncommitted additions
    reserved: HashMap<KeyPath, u32>,
}

impl Session {
    /// Builds the link tree for `node` with a first scan pass.
    ///
    /// Backup roles cannot be scanned for editing; asking for one fails.
    pub fn open(node: &CompositeNode, options: SessionOptions) -> Result<Session> {
        let mut roles: Vec<RoleId> = Vec::new();
        for role in options.roles {
            if role.is_backup() {
                return Err(Error::InvalidOperation(format!(
                    "backup role {} cannot be opened for editing",
                    role
                )));
            }
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        let options = SessionOptions { roles, ..options };

        let mut tree = LinkTree::new();
        pass::run(&mut tree, node, &options.roles)?;
        Ok(Session {
            node_id: node.id(),
            options,
            tree,
            reserved: HashMap::new(),
        })
    }

    /// Rescans the node and reconciles the link tree with it.
    ///
    /// On error the previous tree is kept unchanged.
    pub fn refresh(&mut self, node: &CompositeNode) -> Result<PassReport> {
        self.check_node(node)?;
        let mut tree = self.tree.clone();
        let report = pass::run(&mut tree, node, &self.options.roles)?;
        self.tree = tree;
        Ok(report)
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn tree(&self) -> &LinkTree {
        &self.tree
    }

    pub fn root(&self) -> LinkId {
        self.tree.root()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.tree.get(id)
    }

    pub fn find(&self, path: &KeyPath) -> Option<LinkId> {
        self.tree.find(path)
    }

    pub fn children(&self, id: LinkId) -> &[LinkId] {
        self.tree.get(id).map(|l| l.children()).unwrap_or(&[])
    }

    /// Pending links in tree order.
    pub fn pending(&self) -> Vec<LinkId> {
        self.tree
            .subtree(self.tree.root())
            .into_iter()
            .filter(|id| self.tree.get(*id).is_some_and(|l| l.status.is_pending()))
            .collect()
    }

    fn check_node(&self, node: &CompositeNode) -> Result<()> {
        if node.id() != self.node_id {
            return Err(Error::InvalidOperation(format!(
                "session belongs to node {}, got {}",
                self.node_id,
                node.id()
            )));
        }
        Ok(())
    }

    fn require(&self, id: LinkId) -> Result<&Link> {
        self.tree.get(id).ok_or(Error::LinkNotFound(id))
    }

    fn require_attribute(&self, id: LinkId) -> Result<&Link> {
        let link = self.require(id)?;
        if link.kind != LinkKind::Attribute {
            return Err(Error::InvalidOperation(format!(
                "link {} ({}) is not an attribute",
                id, link.path
            )));
        }
        Ok(link)
    }

    fn unreachable(path: &KeyPath) -> Error {
        ReconciliationInvariantViolation {
            path: path.clone(),
            detail: "attribute is no longer reachable from its recorded parent".to_string(),
        }
        .into()
    }

    /// The attribute a link stands for: the pending one for `Added` links,
    /// otherwise the one found in `node`.
    fn attribute_of<'a>(&'a self, link: &'a Link, node: &'a CompositeNode) -> Result<Located<'a>> {
        if let Some(attribute) = &link.pending_attribute {
            let parent_path = link.path.parent().unwrap_or_default();
            let host = node
                .node_at(&host_path(&parent_path))
                .ok_or_else(|| Self::unreachable(&link.path))?;
            let parent = node.locate(&parent_path).map(|found| found.attribute);
            return Ok(Located {
                host,
                parent,
                attribute,
            });
        }
        node.locate(&link.path).ok_or_else(|| Self::unreachable(&link.path))
    }

    /// Marks a link and its whole subtree removed, or restores them.
    ///
    /// Exactly reversible: toggling twice leaves every status, previous
    /// status and position as it was. A link under a removed parent cannot
    /// be restored on its own. Returns the link's new status.
    pub fn toggle_removed(&mut self, id: LinkId) -> Result<LinkStatus> {
        let link = self.require_attribute(id)?;
        let restoring = link.status == LinkStatus::Removed;
        if restoring {
            let parent_removed = link
                .parent
                .and_then(|p| self.tree.get(p))
                .is_some_and(|p| p.status == LinkStatus::Removed);
            if parent_removed {
                return Err(Error::InvalidOperation(format!(
                    "{} is inside a removed subtree; restore the parent instead",
                    link.path
                )));
            }
        }

        for member in self.tree.subtree(id) {
            if let Some(link) = self.tree.get_mut(member) {
                if restoring {
                    link.status = link.previous_status;
                    link.previous_status = link.removal_stash.pop().unwrap_or_default();
                } else {
                    link.removal_stash.push(link.previous_status);
                    link.previous_status = link.status;
                    link.status = LinkStatus::Removed;
                }
            }
        }
        let status = self.require(id)?.status;
        debug!(link = %id, ?status, "toggled removal");
        Ok(status)
    }

    /// Records an edited value for a link.
    ///
    /// The text must parse to the attribute's type and pass its validator.
    /// On error nothing changes. Text equal to the last committed value
    /// reverts the link to `NotUpdated`.
    pub fn commit_edit(
        &mut self,
        id: LinkId,
        text: &str,
        node: &CompositeNode,
        types: &TypeRegistry,
        functions: &FunctionRegistry,
    ) -> Result<()> {
        self.check_node(node)?;
        let link = self.require_attribute(id)?;
        if link.status == LinkStatus::Removed {
            return Err(Error::InvalidOperation(format!(
                "{} is marked removed",
                link.path
            )));
        }
        if !link.editable || !self.options.window.allows_editing() {
            return Err(Error::NotEditable(link.path.clone()));
        }

        let located = self.attribute_of(link, node)?;
        let handle = located.attribute.type_handle();
        let value = types
            .parse(&handle, text)
            .map_err(|e| e.at(&link.path))?;

        let ctx = ValidationContext {
            path: &link.path,
            window: self.options.window,
            types,
        };
        functions
            .validator_or_default(located.attribute.validator())
            .call(&ctx, located.host, located.parent, located.attribute, text)
            .map_err(|message| ValidationError {
                path: link.path.clone(),
                message,
            })?;

        let formatted = types.format(&value);
        let Some(link) = self.tree.get_mut(id) else {
            return Err(Error::LinkNotFound(id));
        };
        if let Some(pending) = link.pending_attribute.as_mut() {
            pending.set_value(value);
        } else if formatted == link.last_committed_text {
            link.pending_text = None;
            link.status = LinkStatus::NotUpdated;
        } else {
            link.pending_text = Some(formatted);
            link.status = LinkStatus::Updated;
        }
        Ok(())
    }

    /// Adds a pending attribute under a container link.
    ///
    /// Dictionary and role parents need a `key` not already used by any
    /// child link. List parents ignore `key`; the element gets the next
    /// interactive id of that list. `position` defaults to the end.
    pub fn add_attribute(
        &mut self,
        node: &CompositeNode,
        parent: LinkId,
        key: Option<Key>,
        mut attribute: Attribute,
        position: Option<usize>,
    ) -> Result<LinkId> {
        self.check_node(node)?;
        let parent_link = self.require(parent)?;
        if !parent_link.is_container() {
            return Err(Error::InvalidOperation(format!(
                "{} cannot hold attributes",
                parent_link.path
            )));
        }
        if parent_link.status != LinkStatus::NotUpdated {
            return Err(Error::InvalidOperation(format!(
                "{} has pending changes; commit them before adding",
                parent_link.path
            )));
        }
        if !self.options.window.allows_editing() {
            return Err(Error::NotEditable(parent_link.path.clone()));
        }
        let parent_path = parent_link.path.clone();
        let main_role = parent_link.main_role.or(match parent_link.kind {
            LinkKind::Role(role) => Some(role),
            _ => None,
        });
        let current_role = match parent_link.kind {
            LinkKind::Role(role) => Some(role),
            _ => parent_link.current_role,
        };
        let mut children = parent_link.children.clone();

        let segment = match node.container(&parent_path) {
            Some(ContainerRef::List(list)) => {
                let ElementId::Interactive(next) = list.next_interactive_id() else {
                    return Err(Self::unreachable(&parent_path));
                };
                let reserved = self.reserved.get(&parent_path).copied().unwrap_or(0);
                let n = next.max(reserved);
                self.reserved.insert(parent_path.clone(), n + 1);
                attribute.set_identity(ElementId::Interactive(n));
                Segment::Element(ElementId::Interactive(n))
            }
            Some(ContainerRef::Dict(_)) => {
                let key = key.ok_or_else(|| {
                    Error::InvalidOperation(format!("adding to {} needs a key", parent_path))
                })?;
                if self
                    .tree
                    .find(&parent_path.child(Segment::Key(key.clone())))
                    .is_some()
                {
                    return Err(DuplicateKeyError {
                        key: Segment::Key(key),
                    }
                    .into());
                }
                Segment::Key(key)
            }
            None => return Err(Self::unreachable(&parent_path)),
        };

        let mut link = Link::new(
            LinkKind::Attribute,
            parent_path.child(segment),
            Some(parent),
        );
        link.describe(&attribute);
        link.status = LinkStatus::Added;
        link.visited = true;
        link.main_role = main_role;
        link.current_role = current_role;
        link.last_committed_text = attribute.value().to_string();
        link.pending_attribute = Some(attribute);

        let id = self.tree.insert(link);
        let at = position.unwrap_or(children.len()).min(children.len());
        children.insert(at, id);
        self.tree.set_children(parent, children);
        debug!(link = %id, parent = %parent_path, "attribute added");
        Ok(id)
    }

    /// Reverts one pending link.
    ///
    /// An `Added` link is dropped, an `Updated` link forgets its text and a
    /// `Removed` link is restored.
    pub fn discard(&mut self, id: LinkId) -> Result<()> {
        let link = self.require_attribute(id)?;
        let (status, parent) = (link.status, link.parent);
        match status {
            LinkStatus::NotUpdated => Ok(()),
            LinkStatus::Removed => self.toggle_removed(id).map(|_| ()),
            LinkStatus::Updated => {
                if let Some(link) = self.tree.get_mut(id) {
                    link.pending_text = None;
                    link.status = LinkStatus::NotUpdated;
                }
                Ok(())
            }
            LinkStatus::Added => {
                self.tree.remove_subtree(id);
                if let Some(parent) = parent {
                    let children: Vec<LinkId> = self
                        .children(parent)
                        .iter()
                        .copied()
                        .filter(|c| *c != id)
                        .collect();
                    self.tree.set_children(parent, children);
                }
                Ok(())
            }
        }
    }

    /// Presentation descriptor for an attribute link.
    pub fn descriptor(
        &self,
        id: LinkId,
        node: &CompositeNode,
        types: &TypeRegistry,
        functions: &FunctionRegistry,
    ) -> Result<PresentationDescriptor> {
        let link = self.require_attribute(id)?;
        let located = self.attribute_of(link, node)?;
        let key = link
            .segment()
            .ok_or_else(|| Self::unreachable(&link.path))?;
        let main_role = link.main_role.unwrap_or(RoleId::Own);
        let input = PolicyInput {
            attribute: located.attribute,
            key,
            main_node: node,
            main_role,
            current_role: link.current_role.unwrap_or(main_role),
            window: self.options.window,
            editable: link.editable && link.status != LinkStatus::Removed,
            types,
        };
        let mut descriptor = functions
            .policy_or_default(located.attribute.presentation_policy())
            .call(&input);
        descriptor.status = link.status;
        descriptor.emphasized = link.emphasized;
        descriptor.contains_changes = link.contains_changes;
        if let Some(text) = &link.pending_text {
            descriptor.new_value.current_value = text.clone();
        }
        Ok(descriptor)
    }

    /// Applies every pending link to `node` and rebuilds the session.
    ///
    /// Fails without touching the node when a pending link no longer reaches
    /// its attribute. Otherwise every step is attempted; the ones that fail
    /// are listed in the report. Once the node has changed the call no
    /// longer fails: a rescan error is reported too and leaves the session
    /// empty until the next [`refresh`](Self::refresh).
    pub fn commit(&mut self, node: &mut CompositeNode, types: &TypeRegistry) -> Result<CommitReport> {
        self.check_node(node)?;
        let mut report = commit::apply(&self.tree, node, types)?;
        let mut tree = LinkTree::new();
        let rescan = pass::run(&mut tree, node, &self.options.roles).map(|_| tree);
        self.settle(rescan, &mut report);
        Ok(report)
    }

    /// Swaps in the tree scanned after a commit.
    fn settle(&mut self, rescan: Result<LinkTree>, report: &mut CommitReport) {
        self.reserved.clear();
        self.tree = match rescan {
            Ok(tree) => tree,
            Err(error) => {
                warn!(%error, "rescan after commit failed, session emptied");
                report.failures.push(CommitFailure {
                    path: KeyPath::root(),
                    error,
                });
                LinkTree::new()
            }
        };
    }
}

/// The path of the node that owns the container at `path`: everything up to
/// (not including) the last role segment.
fn host_path(path: &KeyPath) -> KeyPath {
    let segments = path.segments();
    let last_role = segments
        .iter()
        .rposition(|s| matches!(s, Segment::Role(_)))
        .unwrap_or(0);
    KeyPath::from_segments(segments[..last_role].to_vec())
}
