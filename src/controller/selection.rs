//! The single source of truth for which items are selected.
//!
//! Table checkboxes and collision hits both funnel through
//! [`SelectionCoordinator::toggle`]; views only read the result.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::model::ItemId;

/// Delta produced by a coordinator operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub added: Vec<ItemId>,
    pub removed: Vec<ItemId>,
    pub last_selected_before: Option<ItemId>,
    pub last_selected: Option<ItemId>,
    /// Selection size after the change.
    pub remaining: usize,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn last_selected_changed(&self) -> bool {
        self.last_selected_before != self.last_selected
    }

    /// The item that became last-selected through this change, if any.
    pub fn new_last_selected(&self) -> Option<&ItemId> {
        if self.last_selected_changed() {
            self.last_selected.as_ref()
        } else {
            None
        }
    }

    pub fn emptied_selection(&self) -> bool {
        !self.is_empty() && self.remaining == 0
    }
}

#[derive(Debug, Default)]
pub struct SelectionCoordinator {
    /// Insertion order doubles as selection recency.
    selected: IndexSet<ItemId>,
    last_selected: Option<ItemId>,
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &ItemId, selected: bool) -> SelectionChange {
        let mut change = SelectionChange {
            last_selected_before: self.last_selected.clone(),
            ..Default::default()
        };

        if selected {
            if self.selected.insert(id.clone()) {
                self.last_selected = Some(id.clone());
                change.added.push(id.clone());
            }
        } else if self.selected.shift_remove(id) {
            change.removed.push(id.clone());
            self.settle_last_selected();
        }

        self.finish(change)
    }

    pub fn clear(&mut self) -> SelectionChange {
        let change = SelectionChange {
            removed: self.selected.drain(..).collect(),
            last_selected_before: self.last_selected.take(),
            ..Default::default()
        };
        self.finish(change)
    }

    /// Drop every selected id not in `valid_ids`.
    pub fn prune(&mut self, valid_ids: &HashSet<ItemId>) -> SelectionChange {
        let mut change = SelectionChange {
            last_selected_before: self.last_selected.clone(),
            ..Default::default()
        };

        self.selected.retain(|id| {
            let keep = valid_ids.contains(id);
            if !keep {
                change.removed.push(id.clone());
            }
            keep
        });
        self.settle_last_selected();

        self.finish(change)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.selected.contains(id)
    }

    /// Selected ids, oldest selection first.
    pub fn selected(&self) -> impl Iterator<Item = &ItemId> {
        self.selected.iter()
    }

    pub fn last_selected(&self) -> Option<&ItemId> {
        self.last_selected.as_ref()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// If last-selected is no longer selected, fall back to the most recent survivor.
    fn settle_last_selected(&mut self) {
        let still_selected = self
            .last_selected
            .as_ref()
            .is_some_and(|id| self.selected.contains(id));
        if !still_selected {
            self.last_selected = self.selected.last().cloned();
        }
    }

    fn finish(&self, mut change: SelectionChange) -> SelectionChange {
        change.last_selected = self.last_selected.clone();
        change.remaining = self.selected.len();
        if !change.is_empty() {
            tracing::debug!(
                added = change.added.len(),
                removed = change.removed.len(),
                remaining = change.remaining,
                last_selected = ?change.last_selected,
                "selection changed"
            );
        }
        change
    }
}
