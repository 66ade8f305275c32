//! Writing pending links back into the node.
//!
//! Commit runs in three phases over the pending links, collected in tree
//! order (descendants of removed and added links are skipped):
//!
//! 1. **Check**: every pending link must still reach its attribute (or, for
//!    additions, its container). A broken link fails the whole commit
//!    before anything is touched.
//! 2. **Apply**: updates, then removals, then additions. A step that fails
//!    is recorded in the report and the rest carry on.
//! 3. **Rebuild**: the caller reopens the session on the mutated node.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::link::{Link, LinkStatus, LinkTree};
use crate::attributes::{Attribute, TypeRegistry};
use crate::error::{Error, ReconciliationInvariantViolation, Result};
use crate::model::{CompositeNode, ContainerMut, ContainerRef, KeyPath, Segment};

/// One pending link that could not be applied.
#[derive(Debug)]
pub struct CommitFailure {
    pub path: KeyPath,
    pub error: Error,
}

#[derive(Debug)]
pub struct CommitReport {
    pub updated: usize,
    pub added: usize,
    pub removed: usize,
    pub failures: Vec<CommitFailure>,
    pub committed_at: DateTime<Utc>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Step<'t> {
    Update(&'t Link, &'t str),
    Remove(&'t Link),
    Add(&'t Link, &'t Attribute),
}

impl Step<'_> {
    fn link(&self) -> &Link {
        match self {
            Step::Update(link, _) | Step::Remove(link) | Step::Add(link, _) => link,
        }
    }
}

/// Pending links in tree order. Nothing below a removed or added link is
/// collected: removal takes the subtree with it, and an addition carries
/// its own content.
fn plan(tree: &LinkTree) -> Vec<Step<'_>> {
    let mut steps = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let Some(link) = tree.get(id) else {
            continue;
        };
        match (link.status, &link.pending_attribute) {
            // added, then marked removed: never existed in the node
            (LinkStatus::Removed, Some(_)) => continue,
            (LinkStatus::Removed, None) => {
                steps.push(Step::Remove(link));
                continue;
            }
            (LinkStatus::Added, Some(attribute)) => {
                steps.push(Step::Add(link, attribute));
                continue;
            }
            (LinkStatus::Updated, _) => {
                if let Some(text) = &link.pending_text {
                    steps.push(Step::Update(link, text));
                }
            }
            _ => {}
        }
        stack.extend(link.children.iter().rev().copied());
    }
    steps
}

fn broken(path: &KeyPath, detail: &str) -> Error {
    ReconciliationInvariantViolation {
        path: path.clone(),
        detail: detail.to_string(),
    }
    .into()
}

fn check(steps: &[Step<'_>], node: &CompositeNode) -> Result<()> {
    for step in steps {
        let link = step.link();
        match step {
            Step::Update(..) | Step::Remove(_) => {
                if node.locate(&link.path).is_none() {
                    return Err(broken(&link.path, "pending attribute is no longer in the node"));
                }
            }
            Step::Add(..) => {
                let parent = link.path.parent().unwrap_or_default();
                let fits = match (node.container(&parent), link.segment()) {
                    (Some(ContainerRef::Dict(_)), Some(Segment::Key(_))) => true,
                    (Some(ContainerRef::List(_)), Some(Segment::Element(_))) => true,
                    _ => false,
                };
                if !fits {
                    return Err(broken(&link.path, "container for the addition is gone"));
                }
            }
        }
    }
    Ok(())
}

/// Container index an added link lands at: the number of earlier siblings
/// that exist in the container at this point of the commit.
fn insertion_index(tree: &LinkTree, link: &Link, container: ContainerRef<'_>) -> usize {
    let siblings = link
        .parent
        .and_then(|p| tree.get(p))
        .map(|p| p.children.as_slice())
        .unwrap_or(&[]);
    siblings
        .iter()
        .take_while(|id| **id != link.id)
        .filter_map(|id| tree.get(*id))
        .filter(|sibling| {
            sibling
                .segment()
                .is_some_and(|segment| container.child(segment).is_some())
        })
        .count()
}

fn update(node: &mut CompositeNode, link: &Link, text: &str, types: &TypeRegistry) -> Result<()> {
    let handle = match &link.type_handle {
        Some(handle) => handle.clone(),
        None => node
            .locate(&link.path)
            .map(|found| found.attribute.type_handle())
            .ok_or_else(|| broken(&link.path, "attribute vanished during commit"))?,
    };
    let value = types.parse(&handle, text).map_err(|e| e.at(&link.path))?;
    let attribute = node
        .attribute_mut(&link.path)
        .ok_or_else(|| broken(&link.path, "attribute vanished during commit"))?;
    attribute.set_value(value);
    Ok(())
}

fn remove(node: &mut CompositeNode, link: &Link) -> Result<()> {
    let parent = link.path.parent().unwrap_or_default();
    let segment = link
        .segment()
        .ok_or_else(|| broken(&link.path, "link has no segment"))?;
    node.container_mut(&parent)
        .and_then(|container| container.remove(segment))
        .map(|_| ())
        .ok_or_else(|| broken(&link.path, "attribute vanished during commit"))
}

fn add(node: &mut CompositeNode, tree: &LinkTree, link: &Link, attribute: &Attribute) -> Result<()> {
    let parent = link.path.parent().unwrap_or_default();
    let index = node
        .container(&parent)
        .map(|container| insertion_index(tree, link, container))
        .ok_or_else(|| broken(&link.path, "container vanished during commit"))?;

    match (node.container_mut(&parent), link.segment()) {
        (Some(ContainerMut::Dict(dict)), Some(Segment::Key(key))) => {
            dict.insert_at(index, key.clone(), attribute.clone())?;
            Ok(())
        }
        (Some(ContainerMut::List(list)), Some(Segment::Element(_))) => {
            list.insert_at(index, attribute.clone(), false);
            Ok(())
        }
        _ => Err(broken(&link.path, "container vanished during commit")),
    }
}

/// Applies every pending link of `tree` to `node`.
pub(crate) fn apply(
    tree: &LinkTree,
    node: &mut CompositeNode,
    types: &TypeRegistry,
) -> Result<CommitReport> {
    let steps = plan(tree);
    check(&steps, node)?;

    let mut report = CommitReport {
        updated: 0,
        added: 0,
        removed: 0,
        failures: Vec::new(),
        committed_at: Utc::now(),
    };
    let record = |report: &mut CommitReport, link: &Link, error: Error| {
        warn!(path = %link.path, %error, "commit step failed");
        report.failures.push(CommitFailure {
            path: link.path.clone(),
            error,
        });
    };

    for step in &steps {
        if let Step::Update(link, text) = step {
            match update(node, link, text, types) {
                Ok(()) => report.updated += 1,
                Err(error) => record(&mut report, link, error),
            }
        }
    }
    for step in &steps {
        if let Step::Remove(link) = step {
            match remove(node, link) {
                Ok(()) => report.removed += 1,
                Err(error) => record(&mut report, link, error),
            }
        }
    }
    for step in &steps {
        if let Step::Add(link, attribute) = step {
            match add(node, tree, link, attribute) {
                Ok(()) => report.added += 1,
                Err(error) => record(&mut report, link, error),
            }
        }
    }

    info!(
        node = node.name(),
        updated = report.updated,
        added = report.added,
        removed = report.removed,
        failed = report.failures.len(),
        "commit applied"
    );
    Ok(report)
}
