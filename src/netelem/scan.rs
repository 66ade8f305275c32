//! # Scan-and-Report
//!
//! Depth-first traversal of a [`CompositeNode`] driven by a [`Consumer`].
//!
//! For every entry of the current container, in stable iteration order:
//!
//! ```text
//! if !consumer.should_visit(ctx, attribute): skip
//! if attribute is a container or node reference:
//!     on_open, recurse, on_close
//! else:
//!     on_leaf
//! ```
//!
//! Node references recurse into the roles returned by
//! [`Consumer::nested_roles`], each bracketed by `on_enter_role` /
//! `on_exit_role`. The main role stays fixed for the whole scan; the current
//! role follows the innermost node.
//!
//! A scan is one uninterrupted call stack. Any hook returning an error aborts
//! it immediately and the error propagates to the caller.

use crate::attributes::{Attribute, Value};
use crate::error::Result;
use crate::model::{CompositeNode, KeyPath, RoleId, Segment};

/// Where the scanner is when it calls a hook.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// The innermost node whose role is being scanned
    pub host: &'a CompositeNode,
    pub main_role: RoleId,
    pub current_role: RoleId,
    /// Path from the scanned root to the attribute (or role) at hand
    pub path: &'a KeyPath,
    /// Nesting depth; entries of the top role are at depth 0
    pub depth: usize,
}

impl<'a> ScanContext<'a> {
    /// The last path segment: the attribute's key or element id, or the role.
    pub fn segment(&self) -> Option<&'a Segment> {
        self.path.last()
    }
}

/// A pluggable visitor over the attribute tree.
pub trait Consumer {
    /// Inclusion policy. Must not depend on consumer state mutated by the scan.
    fn should_visit(&self, ctx: &ScanContext<'_>, attribute: &Attribute) -> bool;

    fn on_open(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()>;

    fn on_leaf(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()>;

    fn on_close(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()>;

    fn on_enter_role(&mut self, _ctx: &ScanContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_exit_role(&mut self, _ctx: &ScanContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Roles of a referenced node to descend into.
    fn nested_roles(&self, _ctx: &ScanContext<'_>, _node: &CompositeNode) -> Vec<RoleId> {
        RoleId::SCANNABLE.to_vec()
    }
}

impl CompositeNode {
    /// Scans `current_role` of this node with `consumer`.
    pub fn scan(
        &self,
        consumer: &mut dyn Consumer,
        main_role: RoleId,
        current_role: RoleId,
    ) -> Result<()> {
        let mut path = KeyPath::root();
        let mut scanner = Scanner {
            consumer,
            main_role,
        };
        scanner.role(self, current_role, &mut path, 0)
    }
}

struct Scanner<'c> {
    consumer: &'c mut dyn Consumer,
    main_role: RoleId,
}

impl Scanner<'_> {
    fn role(
        &mut self,
        host: &CompositeNode,
        role: RoleId,
        path: &mut KeyPath,
        depth: usize,
    ) -> Result<()> {
        path.push(Segment::Role(role));
        let result = self.role_inner(host, role, path, depth);
        path.pop();
        result
    }

    fn role_inner(
        &mut self,
        host: &CompositeNode,
        role: RoleId,
        path: &mut KeyPath,
        depth: usize,
    ) -> Result<()> {
        let ctx = self.context(host, role, path, depth);
        self.consumer.on_enter_role(&ctx)?;
        for (key, attribute) in host.role(role).iter() {
            self.visit(host, role, Segment::Key(key.clone()), attribute, path, depth)?;
        }
        let ctx = self.context(host, role, path, depth);
        self.consumer.on_exit_role(&ctx)
    }

    fn visit(
        &mut self,
        host: &CompositeNode,
        role: RoleId,
        segment: Segment,
        attribute: &Attribute,
        path: &mut KeyPath,
        depth: usize,
    ) -> Result<()> {
        path.push(segment);
        let result = self.visit_inner(host, role, attribute, path, depth);
        path.pop();
        result
    }

    fn visit_inner(
        &mut self,
        host: &CompositeNode,
        role: RoleId,
        attribute: &Attribute,
        path: &mut KeyPath,
        depth: usize,
    ) -> Result<()> {
        let ctx = self.context(host, role, path, depth);
        if !self.consumer.should_visit(&ctx, attribute) {
            return Ok(());
        }
        if !attribute.category().is_complex() {
            return self.consumer.on_leaf(&ctx, attribute);
        }

        self.consumer.on_open(&ctx, attribute)?;
        let nested = match attribute.value() {
            Value::Node(node) => self.consumer.nested_roles(&ctx, node),
            _ => Vec::new(),
        };

        match attribute.value() {
            Value::Dictionary(dict) => {
                for (key, child) in dict.iter() {
                    self.visit(host, role, Segment::Key(key.clone()), child, path, depth + 1)?;
                }
            }
            Value::List(list) => {
                for child in list.iter() {
                    if let Some(id) = child.identity() {
                        self.visit(host, role, Segment::Element(id), child, path, depth + 1)?;
                    }
                }
            }
            Value::Node(node) => {
                for nested_role in nested {
                    if nested_role.is_backup() {
                        continue;
                    }
                    self.role(node, nested_role, path, depth + 1)?;
                }
            }
            _ => {}
        }

        let ctx = self.context(host, role, path, depth);
        self.consumer.on_close(&ctx, attribute)
    }

    fn context<'a>(
        &self,
        host: &'a CompositeNode,
        role: RoleId,
        path: &'a KeyPath,
        depth: usize,
    ) -> ScanContext<'a> {
        ScanContext {
            host,
            main_role: self.main_role,
            current_role: role,
            path,
            depth,
        }
    }
}

/// Marks subtrees whose descendants a consumer must skip.
///
/// A consumer pushes the path of the attribute that starts a suppressed
/// subtree in `on_open` and pops it in the matching `on_close`. Nothing else
/// about the scan changes, so other consumers walking the same tree are
/// unaffected.
#[derive(Debug, Clone, Default)]
pub struct SuppressionStack {
    entries: Vec<KeyPath>,
}

impl SuppressionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &KeyPath) {
        self.entries.push(path.clone());
    }

    /// Pops the top entry if it was pushed for `path`.
    pub fn pop_if(&mut self, path: &KeyPath) -> bool {
        if self.entries.last() == Some(path) {
            self.entries.pop();
            true
        } else {
            false
        }
    }

    /// True when inside at least one suppressed subtree.
    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

/// Collects the paths of every visited attribute matching a predicate.
pub struct PathCollector<F> {
    predicate: F,
    paths: Vec<KeyPath>,
}

impl<F> PathCollector<F>
where
    F: Fn(&Attribute) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            paths: Vec::new(),
        }
    }

    pub fn paths(&self) -> &[KeyPath] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<KeyPath> {
        self.paths
    }

    fn collect(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) {
        if (self.predicate)(attribute) {
            self.paths.push(ctx.path.clone());
        }
    }
}

impl<F> Consumer for PathCollector<F>
where
    F: Fn(&Attribute) -> bool,
{
    fn should_visit(&self, _ctx: &ScanContext<'_>, _attribute: &Attribute) -> bool {
        true
    }

    fn on_open(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        self.collect(ctx, attribute);
        Ok(())
    }

    fn on_leaf(&mut self, ctx: &ScanContext<'_>, attribute: &Attribute) -> Result<()> {
        self.collect(ctx, attribute);
        Ok(())
    }

    fn on_close(&mut self, _ctx: &ScanContext<'_>, _attribute: &Attribute) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeDictionary, AttributeList, Category, Key};
    use crate::error::Error;
    use crate::model::NodeKind;

    /// Records every hook call as a short string.
    struct Recorder {
        include_containers: bool,
        calls: Vec<String>,
    }

    impl Recorder {
        fn new(include_containers: bool) -> Self {
            Self {
                include_containers,
                calls: Vec::new(),
            }
        }
    }

    impl Consumer for Recorder {
        fn should_visit(&self, _ctx: &ScanContext<'_>, attribute: &Attribute) -> bool {
            match attribute.category() {
                Category::Primitive | Category::EnumValue => true,
                _ => self.include_containers,
            }
        }

        fn on_open(&mut self, ctx: &ScanContext<'_>, _attribute: &Attribute) -> Result<()> {
            self.calls.push(format!("open {}", ctx.path));
            Ok(())
        }

        fn on_leaf(&mut self, ctx: &ScanContext<'_>, _attribute: &Attribute) -> Result<()> {
            self.calls.push(format!("leaf {} @{}", ctx.path, ctx.depth));
            Ok(())
        }

        fn on_close(&mut self, ctx: &ScanContext<'_>, _attribute: &Attribute) -> Result<()> {
            self.calls.push(format!("close {}", ctx.path));
            Ok(())
        }

        fn on_enter_role(&mut self, ctx: &ScanContext<'_>) -> Result<()> {
            self.calls
                .push(format!("enter {} main={}", ctx.current_role, ctx.main_role));
            Ok(())
        }
    }

    fn scenario() -> CompositeNode {
        let mut node = CompositeNode::new(NodeKind::Process, "p");
        let own = node.role_mut(RoleId::Own);
        own.add(Key::name("A"), Attribute::new(Value::tag("E", "X")))
            .unwrap();
        own.add(Key::name("B"), Attribute::new(Value::dictionary()))
            .unwrap();
        own.add(Key::name("C"), Attribute::new(Value::Int(5)))
            .unwrap();
        node
    }

    fn count(calls: &[String], prefix: &str) -> usize {
        calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    #[test]
    fn leaf_only_policy_skips_containers() {
        let node = scenario();
        let mut recorder = Recorder::new(false);
        node.scan(&mut recorder, RoleId::Own, RoleId::Own).unwrap();

        assert_eq!(count(&recorder.calls, "leaf"), 2);
        assert_eq!(count(&recorder.calls, "open"), 0);
        assert_eq!(count(&recorder.calls, "close"), 0);
        assert!(recorder.calls.contains(&"leaf own/A @0".to_string()));
        assert!(recorder.calls.contains(&"leaf own/C @0".to_string()));
    }

    #[test]
    fn container_policy_opens_and_closes() {
        let node = scenario();
        let mut recorder = Recorder::new(true);
        node.scan(&mut recorder, RoleId::Own, RoleId::Own).unwrap();

        assert_eq!(
            recorder.calls,
            vec![
                "enter own main=own",
                "leaf own/A @0",
                "open own/B",
                "close own/B",
                "leaf own/C @0",
            ]
        );
    }

    #[test]
    fn nested_nodes_switch_current_role() {
        let mut inner = CompositeNode::new(NodeKind::Channel, "c");
        inner
            .role_mut(RoleId::Private)
            .add(Key::name("Delay"), Attribute::new(Value::Int(1)))
            .unwrap();

        let mut list = AttributeList::new();
        list.add(Attribute::new(Value::Bool(true)), true);

        let mut node = CompositeNode::new(NodeKind::Process, "p");
        node.role_mut(RoleId::Private)
            .add(Key::name("Link"), Attribute::new(inner.into_value()))
            .unwrap();
        node.role_mut(RoleId::Private)
            .add(Key::name("Flags"), Attribute::new(Value::List(list)))
            .unwrap();

        let mut recorder = Recorder::new(true);
        node.scan(&mut recorder, RoleId::Private, RoleId::Private)
            .unwrap();

        assert!(recorder
            .calls
            .contains(&"enter private main=private".to_string()));
        assert!(recorder
            .calls
            .contains(&"leaf private/Link/private/Delay @1".to_string()));
        assert!(recorder
            .calls
            .contains(&"leaf private/Flags/b0 @1".to_string()));
        assert_eq!(count(&recorder.calls, "enter"), 1 + RoleId::SCANNABLE.len());
    }

    #[test]
    fn hook_errors_abort_the_scan() {
        struct Failing(usize);
        impl Consumer for Failing {
            fn should_visit(&self, _: &ScanContext<'_>, _: &Attribute) -> bool {
                true
            }
            fn on_open(&mut self, _: &ScanContext<'_>, _: &Attribute) -> Result<()> {
                Ok(())
            }
            fn on_leaf(&mut self, _: &ScanContext<'_>, _: &Attribute) -> Result<()> {
                self.0 += 1;
                Err(Error::InvalidOperation("stop".into()))
            }
            fn on_close(&mut self, _: &ScanContext<'_>, _: &Attribute) -> Result<()> {
                Ok(())
            }
        }

        let node = scenario();
        let mut failing = Failing(0);
        assert!(node.scan(&mut failing, RoleId::Own, RoleId::Own).is_err());
        assert_eq!(failing.0, 1);
    }

    #[test]
    fn suppression_stack_pairs_push_and_pop() {
        let outer = KeyPath::from_segments(vec![Segment::Role(RoleId::Own)]);
        let inner = outer.child(Segment::Key(Key::name("x")));

        let mut stack = SuppressionStack::new();
        assert!(!stack.is_active());
        stack.push(&outer);
        assert!(stack.is_active());
        assert!(!stack.pop_if(&inner));
        assert!(stack.pop_if(&outer));
        assert!(!stack.is_active());
    }

    #[test]
    fn path_collector_uses_predicate() {
        let mut node = scenario();
        let mut nested = AttributeDictionary::new();
        nested
            .add(Key::name("D"), Attribute::new(Value::Int(7)))
            .unwrap();
        node.role_mut(RoleId::Own)
            .add(Key::name("N"), Attribute::new(Value::Dictionary(nested)))
            .unwrap();

        let mut collector = PathCollector::new(|a| a.value() == &Value::Int(7));
        node.scan(&mut collector, RoleId::Own, RoleId::Own).unwrap();
        let paths: Vec<String> = collector.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["own/N/D"]);
    }
}
