//! Ordered, key-addressed attribute container.

use std::fmt;
use std::sync::Arc;

use super::{Attribute, Key};
use crate::error::DuplicateKeyError;
use crate::model::Segment;

/// Structural change reported to a container observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    Added(Segment),
    Removed(Segment),
    Cleared,
}

/// Callback invoked after every structural change of a container.
pub type ChangeObserver = Arc<dyn Fn(&ContainerEvent) + Send + Sync>;

/// Wraps a closure as a [`ChangeObserver`].
pub fn observer<F>(f: F) -> ChangeObserver
where
    F: Fn(&ContainerEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered mapping from [`Key`] to [`Attribute`].
///
/// Insertion order is significant and preserved. Keys are unique: adding an
/// existing key fails and leaves the dictionary untouched.
#[derive(Default)]
pub struct AttributeDictionary {
    entries: Vec<(Key, Attribute)>,
    changed: bool,
    observer: Option<ChangeObserver>,
}

impl AttributeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or removes) the observer notified of structural changes.
    pub fn set_observer(&mut self, observer: Option<ChangeObserver>) {
        self.observer = observer;
    }

    /// Appends an entry.
    pub fn add(&mut self, key: Key, attribute: Attribute) -> Result<(), DuplicateKeyError> {
        let index = self.entries.len();
        self.insert_at(index, key, attribute)
    }

    /// Inserts an entry at `index` (clamped to the length).
    pub fn insert_at(
        &mut self,
        index: usize,
        key: Key,
        attribute: Attribute,
    ) -> Result<(), DuplicateKeyError> {
        if self.contains_key(&key) {
            return Err(DuplicateKeyError {
                key: Segment::Key(key),
            });
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, (key.clone(), attribute));
        self.notify(ContainerEvent::Added(Segment::Key(key)));
        Ok(())
    }

    pub fn remove(&mut self, key: &Key) -> Option<Attribute> {
        let index = self.position(key)?;
        let (key, attribute) = self.entries.remove(index);
        self.notify(ContainerEvent::Removed(Segment::Key(key)));
        Some(attribute)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.notify(ContainerEvent::Cleared);
    }

    pub fn get(&self, key: &Key) -> Option<&Attribute> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, a)| a)
    }

    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Attribute> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, a)| a)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.position(key).is_some()
    }

    pub fn position(&self, key: &Key) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Attribute)> {
        self.entries.iter().map(|(k, a)| (k, a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Key, &mut Attribute)> {
        self.entries.iter_mut().map(|(k, a)| (&*k, a))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if this dictionary was structurally modified, or any attribute
    /// inside it reports a change.
    pub fn is_changed(&self) -> bool {
        self.changed || self.entries.iter().any(|(_, a)| a.is_changed())
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
        for (_, attribute) in &mut self.entries {
            attribute.clear_changed();
        }
    }

    fn notify(&mut self, event: ContainerEvent) {
        self.changed = true;
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

/// Clones entries and the changed flag. The observer stays with the original.
impl Clone for AttributeDictionary {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            changed: self.changed,
            observer: None,
        }
    }
}

impl PartialEq for AttributeDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for AttributeDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, a)| (k, a)))
            .finish()
    }
}
