//! One reconciliation scan pass.
//!
//! 1. Every link is marked unvisited and its per-pass flags are cleared.
//! 2. The node is scanned. Each visited attribute (and role) finds its link by
//!    path or gets a new `NotUpdated` one. A changed value text is recorded
//!    and flagged on every ancestor.
//! 3. When a container closes, its children are rebuilt: visited links in
//!    the container's present order, with unvisited pending links put back
//!    at their recorded positions. All other unvisited links are dropped.

use std::collections::HashMap;

use tracing::debug;

use super::link::{Link, LinkId, LinkKind, LinkStatus, LinkTree};
use crate::attributes::{Attribute, Key};
use crate::error::{ReconciliationInvariantViolation, Result};
use crate::model::{CompositeNode, KeyPath, RoleId, Segment};
use crate::scan::{Consumer, ScanContext};

/// Counts from one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub dropped: usize,
    pub changed_values: usize,
}

/// Runs a full pass over `roles` of `node`, then applies backup emphasis.
pub(crate) fn run(tree: &mut LinkTree, node: &CompositeNode, roles: &[RoleId]) -> Result<PassReport> {
    for link in tree.iter_mut() {
        link.visited = false;
        link.existing_value_changed = false;
        link.contains_changes = false;
        link.emphasized = false;
    }

    let root = tree.root();
    let mut pass = ReconcilePass {
        tree: &mut *tree,
        visit_order: HashMap::new(),
        report: PassReport::default(),
    };
    if let Some(link) = pass.tree.get_mut(root) {
        link.visited = true;
        link.last_committed_text = node.summary();
    }
    for role in roles {
        node.scan(&mut pass, *role, *role)?;
    }
    pass.finalize(root)?;
    let report = pass.report;

    for role in roles {
        if role.backup().is_none() {
            continue;
        }
        for key in node.diff_against_backup(*role)? {
            let path = role_entry(*role, key);
            if let Some(link) = tree.find(&path).and_then(|id| tree.get_mut(id)) {
                link.emphasized = true;
            }
        }
    }

    debug!(
        node = node.name(),
        created = report.created,
        dropped = report.dropped,
        changed = report.changed_values,
        "scan pass complete"
    );
    Ok(report)
}

struct ReconcilePass<'t> {
    tree: &'t mut LinkTree,
    /// Visited children per parent, in container order
    visit_order: HashMap<LinkId, Vec<LinkId>>,
    report: PassReport,
}

impl ReconcilePass<'_> {
    fn violation(path: &KeyPath, detail: impl Into<String>) -> ReconciliationInvariantViolation {
        ReconciliationInvariantViolation {
            path: path.clone(),
            detail: detail.into(),
        }
    }

    fn parent_of(&self, path: &KeyPath) -> Result<LinkId> {
        let parent_path = path
            .parent()
            .ok_or_else(|| Self::violation(path, "scanned path has no parent"))?;
        self.tree
            .find(&parent_path)
            .ok_or_else(|| Self::violation(path, "parent link was not visited first").into())
    }

    /// Step 2 for one attribute or role.
    fn visit(
        &mut self,
        ctx: &ScanContext<'_>,
        kind: LinkKind,
        attribute: Option<&Attribute>,
    ) -> Result<LinkId> {
        let path = ctx.path;
        let parent = self.parent_of(path)?;
        let text = attribute.map(|a| a.value().to_string()).unwrap_or_default();

        let id = match self.tree.find(path) {
            None => {
                let mut link = Link::new(kind, path.clone(), Some(parent));
                link.last_committed_text = text;
                let id = self.tree.insert(link);
                self.report.created += 1;
                id
            }
            Some(id) => {
                let link = self
                    .tree
                    .get(id)
                    .ok_or_else(|| Self::violation(path, "index points at a dropped link"))?;
                if link.parent != Some(parent) {
                    return Err(Self::violation(
                        path,
                        format!(
                            "link is attached to {:?}, scan found it under {}",
                            link.parent, parent
                        ),
                    )
                    .into());
                }
                if link.visited {
                    return Err(Self::violation(path, "attribute reached twice in one pass").into());
                }
                if link.last_committed_text != text {
                    self.mark_changed(id, text);
                }
                id
            }
        };

        if let Some(link) = self.tree.get_mut(id) {
            link.visited = true;
            link.kind = kind;
            link.main_role = Some(ctx.main_role);
            link.current_role = Some(ctx.current_role);
            if let Some(attribute) = attribute {
                link.describe(attribute);
            }
        }
        self.visit_order.entry(parent).or_default().push(id);
        Ok(id)
    }

    fn mark_changed(&mut self, id: LinkId, text: String) {
        self.report.changed_values += 1;
        let mut next = match self.tree.get_mut(id) {
            Some(link) => {
                link.last_committed_text = text;
                link.existing_value_changed = true;
                link.parent
            }
            None => None,
        };
        while let Some(ancestor) = next {
            next = match self.tree.get_mut(ancestor) {
                Some(link) => {
                    link.contains_changes = true;
                    link.parent
                }
                None => None,
            };
        }
    }

    /// Step 3 for one container.
    fn finalize(&mut self, parent: LinkId) -> Result<()> {
        let visited = self.visit_order.remove(&parent).unwrap_or_default();
        let current = match self.tree.get(parent) {
            Some(link) => link.children.clone(),
            None => return Ok(()),
        };

        let mut retained: Vec<(usize, LinkId)> = Vec::new();
        let mut dropped: Vec<LinkId> = Vec::new();
        for child in current {
            let Some(link) = self.tree.get(child) else {
                continue;
            };
            if link.visited {
                continue;
            }
            if link.status != LinkStatus::NotUpdated || self.tree.subtree_has_pending(child) {
                retained.push((link.position_in_parent, child));
            } else {
                dropped.push(child);
            }
        }

        let mut children = visited;
        retained.sort_by_key(|(position, _)| *position);
        for (position, child) in retained {
            let at = position.min(children.len());
            children.insert(at, child);
        }
        for child in dropped {
            self.report.dropped += self.tree.remove_subtree(child);
        }
        self.tree.set_children(parent, children);
        Ok(())
    }

    fn close(&mut self, path: &KeyPath) -> Result<()> {
        let id = self
            .tree
            .find(path)
            .ok_or_else(|| Self::violation(path, "closing a container that was never opened"))?;
        self.finalize(id)
    }
}

impl Consumer for ReconcilePass<'_> {
    fn should_visit(&self, _ctx: &ScanContext<'_>, _attribute: &Attribute) -> bool {
        true
    }

    fn on_enter_role(&mut self, ctx: &ScanContext<'_>) -> Result<()> {
        self.visit(ctx, LinkKind::Role(ctx.current_role), None)?;
        Ok(())
    }

    fn on_exit_role(&mut self, ctx: &ScanContext<'_>) -> Result<()> {
        self.close(ctx.path)
    }

    fn on_open(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        self.visit(ctx, LinkKind::Attribute, Some(attribute))?;
        Ok(())
    }

    fn on_leaf(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        self.visit(ctx, LinkKind::Attribute, Some(attribute))?;
        Ok(())
    }

    fn on_close(&mut self, ctx: &ScanContext<'_>, _attribute: &Attribute) -> Result<()> {
        self.close(ctx.path)
    }
}

/// Path of a top-level role entry.
fn role_entry(role: RoleId, key: Key) -> KeyPath {
    KeyPath::from_segments(vec![Segment::Role(role), Segment::Key(key)])
}
