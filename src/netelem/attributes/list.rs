//! Ordered, index-addressed attribute container with stable element identities.
//!
//! Every element carries an [`ElementId`] stamped once, at its first insertion.
//! Baseline elements (authored or generated) and interactively added elements
//! draw from separate monotonic counters, so an id is never reused and never
//! depends on position. Reconciliation matches list elements across scans by
//! this id.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::dictionary::{ChangeObserver, ContainerEvent};
use super::Attribute;
use crate::model::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementId {
    /// Introduced by the authored/generated baseline
    Baseline(u32),
    /// Added interactively
    Interactive(u32),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Baseline(n) => write!(f, "b{}", n),
            ElementId::Interactive(n) => write!(f, "i{}", n),
        }
    }
}

#[derive(Default)]
pub struct AttributeList {
    items: Vec<Attribute>,
    next_baseline: u32,
    next_interactive: u32,
    changed: bool,
    observer: Option<ChangeObserver>,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a baseline list, stamping a fresh identity on every element.
    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        let mut list = Self::new();
        for attribute in attributes {
            list.add(attribute, true);
        }
        list.changed = false;
        list
    }

    pub fn set_observer(&mut self, observer: Option<ChangeObserver>) {
        self.observer = observer;
    }

    /// Appends an element and returns its index.
    ///
    /// With `assign_identity` a fresh baseline identity is stamped. Without it
    /// the element keeps the identity it already carries (re-insertion); an
    /// element without one, or whose identity is already taken in this list,
    /// is stamped anyway.
    pub fn add(&mut self, attribute: Attribute, assign_identity: bool) -> usize {
        let index = self.items.len();
        self.insert_at(index, attribute, assign_identity)
    }

    /// Appends an element stamped from the interactive counter.
    pub fn add_interactive(&mut self, mut attribute: Attribute) -> usize {
        let id = ElementId::Interactive(self.next_interactive);
        self.next_interactive += 1;
        attribute.set_identity(id);
        let index = self.items.len();
        self.items.push(attribute);
        self.notify(ContainerEvent::Added(Segment::Element(id)));
        index
    }

    /// Inserts an element at `index` (clamped to the length) and returns
    /// where it landed. Identity handling is the same as [`add`](Self::add).
    pub fn insert_at(&mut self, index: usize, mut attribute: Attribute, assign_identity: bool) -> usize {
        let preserved = attribute
            .identity()
            .filter(|id| !assign_identity && self.position_of(*id).is_none());

        let id = match preserved {
            Some(id) => {
                self.reserve(id);
                id
            }
            None => {
                let id = ElementId::Baseline(self.next_baseline);
                self.next_baseline += 1;
                id
            }
        };
        attribute.set_identity(id);

        let index = index.min(self.items.len());
        self.items.insert(index, attribute);
        self.notify(ContainerEvent::Added(Segment::Element(id)));
        index
    }

    /// Removes and returns the element at `index`, or `None` if out of range.
    pub fn remove_at(&mut self, index: usize) -> Option<Attribute> {
        if index >= self.items.len() {
            return None;
        }
        let attribute = self.items.remove(index);
        if let Some(id) = attribute.identity() {
            self.notify(ContainerEvent::Removed(Segment::Element(id)));
        }
        Some(attribute)
    }

    pub fn remove_by_identity(&mut self, id: ElementId) -> Option<Attribute> {
        let index = self.position_of(id)?;
        self.remove_at(index)
    }

    /// Removes all elements. Counters are kept, so ids are never reused.
    pub fn clear(&mut self) {
        self.items.clear();
        self.notify(ContainerEvent::Cleared);
    }

    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Attribute> {
        self.items.get_mut(index)
    }

    pub fn get_by_identity(&self, id: ElementId) -> Option<&Attribute> {
        self.items.iter().find(|a| a.identity() == Some(id))
    }

    pub fn get_by_identity_mut(&mut self, id: ElementId) -> Option<&mut Attribute> {
        self.items.iter_mut().find(|a| a.identity() == Some(id))
    }

    pub fn position_of(&self, id: ElementId) -> Option<usize> {
        self.items.iter().position(|a| a.identity() == Some(id))
    }

    /// The identity the next interactive addition will receive.
    pub fn next_interactive_id(&self) -> ElementId {
        ElementId::Interactive(self.next_interactive)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_changed(&self) -> bool {
        self.changed || self.items.iter().any(|a| a.is_changed())
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
        for attribute in &mut self.items {
            attribute.clear_changed();
        }
    }

    /// Moves the matching counter past a preserved id.
    fn reserve(&mut self, id: ElementId) {
        match id {
            ElementId::Baseline(n) => self.next_baseline = self.next_baseline.max(n + 1),
            ElementId::Interactive(n) => {
                self.next_interactive = self.next_interactive.max(n + 1)
            }
        }
    }

    fn notify(&mut self, event: ContainerEvent) {
        self.changed = true;
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

impl Clone for AttributeList {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            next_baseline: self.next_baseline,
            next_interactive: self.next_interactive,
            changed: self.changed,
            observer: None,
        }
    }
}

impl PartialEq for AttributeList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl fmt::Debug for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}
