//! # Composite Nodes
//!
//! A [`CompositeNode`] is one domain entity (network, process, channel or
//! message): a name, a kind and a fixed set of attribute dictionaries, one per
//! [`RoleId`]. Nodes nest by being the value of an attribute, so a single root
//! node is the whole tree.
//!
//! Two roles are backup mirrors. The host snapshots operation results and
//! presentation parameters into them before a simulated step, and the
//! reconciliation engine diffs against them afterwards to emphasize values
//! that changed underneath the user. Backups are never scanned for editing.

mod path;

pub use path::{ContainerMut, ContainerRef, KeyPath, Located, Segment};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::attributes::{AttributeDictionary, Key, Value};
use crate::error::{Error, Result};
use crate::scan::PathCollector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Network,
    Process,
    Channel,
    Message,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Network => "Network",
            NodeKind::Process => "Process",
            NodeKind::Channel => "Channel",
            NodeKind::Message => "Message",
        };
        f.write_str(name)
    }
}

/// One of the named dictionaries inside a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Own,
    Private,
    OperationParameters,
    OperationResults,
    Presentation,
    OperationResultsBackup,
    PresentationBackup,
}

impl RoleId {
    pub const ALL: [RoleId; 7] = [
        RoleId::Own,
        RoleId::Private,
        RoleId::OperationParameters,
        RoleId::OperationResults,
        RoleId::Presentation,
        RoleId::OperationResultsBackup,
        RoleId::PresentationBackup,
    ];

    /// Every role except the backup mirrors, in scan order.
    pub const SCANNABLE: [RoleId; 5] = [
        RoleId::Own,
        RoleId::Private,
        RoleId::OperationParameters,
        RoleId::OperationResults,
        RoleId::Presentation,
    ];

    /// The mirror this role is snapshotted into, if it has one.
    pub fn backup(self) -> Option<RoleId> {
        match self {
            RoleId::OperationResults => Some(RoleId::OperationResultsBackup),
            RoleId::Presentation => Some(RoleId::PresentationBackup),
            _ => None,
        }
    }

    pub fn is_backup(self) -> bool {
        matches!(
            self,
            RoleId::OperationResultsBackup | RoleId::PresentationBackup
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoleId::Own => "own",
            RoleId::Private => "private",
            RoleId::OperationParameters => "operation_parameters",
            RoleId::OperationResults => "operation_results",
            RoleId::Presentation => "presentation",
            RoleId::OperationResultsBackup => "operation_results_backup",
            RoleId::PresentationBackup => "presentation_backup",
        };
        f.write_str(name)
    }
}

/// A named bundle of role dictionaries representing one domain entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeNode {
    id: Uuid,
    name: String,
    kind: NodeKind,
    roles: [AttributeDictionary; 7],
}

impl CompositeNode {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            roles: Default::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn role(&self, role: RoleId) -> &AttributeDictionary {
        &self.roles[role.index()]
    }

    pub fn role_mut(&mut self, role: RoleId) -> &mut AttributeDictionary {
        &mut self.roles[role.index()]
    }

    /// Replaces a whole role dictionary (generated initializers use this).
    pub fn set_role(&mut self, role: RoleId, dictionary: AttributeDictionary) {
        self.roles[role.index()] = dictionary;
    }

    /// All roles, backups included, in declaration order.
    pub fn roles(&self) -> Vec<(RoleId, &AttributeDictionary)> {
        RoleId::ALL
            .iter()
            .map(|role| (*role, self.role(*role)))
            .collect()
    }

    /// Copies a role into its backup mirror.
    pub fn snapshot_backup(&mut self, role: RoleId) -> Result<()> {
        let backup = role.backup().ok_or(Error::NoBackupRole(role))?;
        let snapshot = self.role(role).clone();
        self.roles[backup.index()] = snapshot;
        Ok(())
    }

    /// Keys of `role` whose full rendering differs from the backup, followed
    /// by keys present only in the backup.
    ///
    /// A key added since the snapshot counts as differing.
    pub fn diff_against_backup(&self, role: RoleId) -> Result<Vec<Key>> {
        let backup_role = role.backup().ok_or(Error::NoBackupRole(role))?;
        let current = self.role(role);
        let backup = self.role(backup_role);

        let mut keys: Vec<Key> = current
            .iter()
            .filter(|(key, attr)| match backup.get(key) {
                Some(old) => old.value().deep_text() != attr.value().deep_text(),
                None => true,
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.extend(
            backup
                .keys()
                .filter(|key| !current.contains_key(key))
                .cloned(),
        );
        Ok(keys)
    }

    /// Short description built from own attributes flagged for the summary.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .role(RoleId::Own)
            .iter()
            .filter(|(_, attr)| attr.is_included_in_summary())
            .map(|(key, attr)| format!("{}: {}", key, attr.value()))
            .collect();
        if parts.is_empty() {
            format!("{} {}", self.kind, self.name)
        } else {
            format!("{} {} ({})", self.kind, self.name, parts.join(", "))
        }
    }

    pub fn is_changed(&self) -> bool {
        self.roles.iter().any(|role| role.is_changed())
    }

    pub fn clear_changed(&mut self) {
        for role in self.roles.iter_mut() {
            role.clear_changed();
        }
    }

    /// Paths of every attribute that reports a change, across scannable roles.
    pub fn changed_paths(&self) -> Result<Vec<KeyPath>> {
        let mut collector = PathCollector::new(|attr| attr.is_changed());
        for role in RoleId::SCANNABLE {
            self.scan(&mut collector, role, role)?;
        }
        Ok(collector.into_paths())
    }

    /// A deep copy under a fresh id.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy
    }

    /// Convenience for building node-reference values.
    pub fn into_value(self) -> Value {
        Value::node(self)
    }
}
