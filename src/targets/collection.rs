//! Generic insertion-ordered collection of capture targets.

use crate::targets::Target;
use uuid::Uuid;

/// An insertion-ordered container of one target kind. Order is preserved
/// across save/load round-trips. No locking: all access is serialized onto
/// the application's single logical thread.
#[derive(Debug, Clone)]
pub struct TargetCollection<T: Target> {
    items: Vec<T>,
}

impl<T: Target> TargetCollection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append a target. No uniqueness check is performed here; callers own
    /// identifier (and, for screens, component) uniqueness.
    pub fn add(&mut self, target: T) {
        self.items.push(target);
    }

    /// Remove the first target with the same identity. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, target: &T) -> bool {
        match self.items.iter().position(|t| t.view_id() == target.view_id()) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Look up the stored target with the same identity. Absence is not an
    /// error.
    pub fn get(&self, target: &T) -> Option<&T> {
        self.by_id(target.view_id())
    }

    pub fn by_id(&self, view_id: Uuid) -> Option<&T> {
        self.items.iter().find(|t| t.view_id() == view_id)
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order. Restartable: each call yields a fresh
    /// iterator over the same sequence.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Target> Default for TargetCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Target> IntoIterator for &'a TargetCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
