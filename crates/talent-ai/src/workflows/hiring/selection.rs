use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{JobId, UserId};

/// Outcome of a column-scoped select-all toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectAllOutcome {
    Selected,
    Deselected,
}

/// Cross-column selection for one job's board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    job_id: JobId,
    selected: BTreeSet<UserId>,
}

impl SelectionSet {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            selected: BTreeSet::new(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Flip one applicant; returns whether it is selected afterwards.
    pub fn toggle(&mut self, user_id: &UserId) -> bool {
        if self.selected.remove(user_id) {
            false
        } else {
            self.selected.insert(user_id.clone());
            true
        }
    }

    /// Deselect `user_ids` when all of them are already selected, otherwise select all of them.
    pub fn select_all(&mut self, user_ids: &[UserId]) -> SelectAllOutcome {
        if self.all_selected(user_ids) {
            for user_id in user_ids {
                self.selected.remove(user_id);
            }
            SelectAllOutcome::Deselected
        } else {
            self.selected.extend(user_ids.iter().cloned());
            SelectAllOutcome::Selected
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, user_id: &UserId) -> bool {
        self.selected.contains(user_id)
    }

    /// False for an empty list so an empty column never renders as checked.
    pub fn all_selected(&self, user_ids: &[UserId]) -> bool {
        !user_ids.is_empty() && user_ids.iter().all(|user_id| self.selected.contains(user_id))
    }

    pub fn selected(&self) -> Vec<UserId> {
        self.selected.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
