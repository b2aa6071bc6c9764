//! In-memory trap status store.
//!
//! The store maps every registered trap id to exactly one status of the
//! configured scheme and carries the selection/enlargement cursors the
//! floor plan renders from. Unknown ids are rejected and never create
//! entries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::error::TrapError;
use crate::models::{Position, TransitionScheme, TrapStatus};
use crate::services::registry::TrapRegistry;

/// One trap as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrapView {
    /// Trap id.
    pub id: String,
    /// Human-readable label.
    pub display_name: String,
    /// Overlay position.
    pub position: Position,
    /// Current status.
    pub status: TrapStatus,
    /// Whether this trap holds the selection cursor.
    pub selected: bool,
    /// Whether this trap is shown enlarged.
    pub enlarged: bool,
}

/// Full store state, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    /// Active status scheme.
    pub scheme: TransitionScheme,
    /// Traps with their statuses.
    pub traps: Vec<TrapView>,
    /// Selected trap id.
    pub selected: Option<String>,
    /// Enlarged trap id.
    pub enlarged: Option<String>,
    /// Number of traps per status.
    pub counts: BTreeMap<TrapStatus, usize>,
}

/// Mapping from trap id to status, plus focus cursors.
#[derive(Debug, Clone)]
pub struct TrapStateStore {
    registry: Arc<TrapRegistry>,
    scheme: TransitionScheme,
    statuses: HashMap<String, TrapStatus>,
    selected: Option<String>,
    enlarged: Option<String>,
}

impl TrapStateStore {
    /// Creates a store with every registered trap at the scheme's initial status.
    pub fn initialize(registry: Arc<TrapRegistry>, scheme: TransitionScheme) -> Self {
        let statuses = registry
            .ids()
            .map(|id| (id.to_string(), scheme.initial()))
            .collect();

        Self {
            registry,
            scheme,
            statuses,
            selected: None,
            enlarged: None,
        }
    }

    /// Active status scheme.
    pub fn scheme(&self) -> TransitionScheme {
        self.scheme
    }

    /// Registry the store covers.
    pub fn registry(&self) -> &TrapRegistry {
        &self.registry
    }

    /// Current status of `id`.
    pub fn get(&self, id: &str) -> Result<TrapStatus, TrapError> {
        self.statuses
            .get(id)
            .copied()
            .ok_or_else(|| TrapError::UnknownTrap(id.to_string()))
    }

    /// Replaces the status of `id` and selects it.
    ///
    /// Returns the previous status.
    pub fn set(&mut self, id: &str, status: TrapStatus) -> Result<TrapStatus, TrapError> {
        let slot = self
            .statuses
            .get_mut(id)
            .ok_or_else(|| TrapError::UnknownTrap(id.to_string()))?;
        if !self.scheme.contains(status) {
            return Err(TrapError::StatusNotInScheme {
                status,
                scheme: self.scheme,
            });
        }

        let previous = std::mem::replace(slot, status);
        self.selected = Some(id.to_string());

        Ok(previous)
    }

    /// Advances `id` to its next status; this is what a click does.
    ///
    /// Returns the new status.
    pub fn cycle(&mut self, id: &str) -> Result<TrapStatus, TrapError> {
        let next = self.scheme.next(self.get(id)?);
        self.set(id, next)?;
        Ok(next)
    }

    /// Sets `id` to the scheme's alert status without moving the selection.
    ///
    /// Used by detection reconciliation, which is not a user action.
    pub fn raise_alert(&mut self, id: &str) -> Result<TrapStatus, TrapError> {
        let alert = self.scheme.alert();
        let slot = self
            .statuses
            .get_mut(id)
            .ok_or_else(|| TrapError::UnknownTrap(id.to_string()))?;
        *slot = alert;
        Ok(alert)
    }

    /// Tally of traps per status; every scheme status is present.
    pub fn counts(&self) -> BTreeMap<TrapStatus, usize> {
        let mut counts: BTreeMap<TrapStatus, usize> = self
            .scheme
            .sequence()
            .iter()
            .map(|&status| (status, 0))
            .collect();

        for status in self.statuses.values() {
            *counts.entry(*status).or_insert(0) += 1;
        }

        counts
    }

    /// Moves the selection cursor to `id` without changing its status.
    pub fn select(&mut self, id: &str) -> Result<(), TrapError> {
        self.registry.require(id)?;
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Clears the selection cursor.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Selected trap id, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Enlarges `id`, or shrinks it back if it already is.
    ///
    /// Returns whether `id` is enlarged afterwards.
    pub fn toggle_enlarged(&mut self, id: &str) -> Result<bool, TrapError> {
        self.registry.require(id)?;
        if self.enlarged.as_deref() == Some(id) {
            self.enlarged = None;
            Ok(false)
        } else {
            self.enlarged = Some(id.to_string());
            Ok(true)
        }
    }

    /// Enlarged trap id, if any.
    pub fn enlarged(&self) -> Option<&str> {
        self.enlarged.as_deref()
    }

    /// Puts every trap back to the initial status and clears both cursors.
    pub fn reset(&mut self) {
        let initial = self.scheme.initial();
        for status in self.statuses.values_mut() {
            *status = initial;
        }
        self.selected = None;
        self.enlarged = None;
    }

    /// View of one trap.
    pub fn view(&self, id: &str) -> Result<TrapView, TrapError> {
        let trap = self.registry.require(id)?;
        Ok(TrapView {
            id: trap.id.clone(),
            display_name: trap.display_name.clone(),
            position: trap.position,
            status: self.get(id)?,
            selected: self.selected.as_deref() == Some(id),
            enlarged: self.enlarged.as_deref() == Some(id),
        })
    }

    /// Ordered view of the whole store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let traps = self
            .registry
            .ids()
            .filter_map(|id| self.view(id).ok())
            .collect();

        StoreSnapshot {
            scheme: self.scheme,
            traps,
            selected: self.selected.clone(),
            enlarged: self.enlarged.clone(),
            counts: self.counts(),
        }
    }
}
