//! Buffered row editing for list views.
//!
//! A [`TableState`] holds the last server snapshot of a list, a set of
//! expanded rows, the active filter, and one edit buffer per row being
//! changed. Edits never touch the store until [`TableState::save_changes`]
//! hands out a [`PendingSave`]; the caller writes it and reports back with
//! [`TableState::complete_save`] or [`TableState::fail_save`].
//!
//! # Row lifecycle
//!
//! ```text
//! Clean --edit--> Dirty --save--> Saving --ack--> Clean
//!                   ^                |
//!                   +---- failure ---+
//! Dirty/Saving --snapshot with newer, different row--> Conflict
//! Conflict --resolve(keep mine)--> Dirty
//! Conflict --resolve(take theirs)--> Clean
//! ```
//!
//! Snapshots are reconciled row by row using entity versions, so a remote
//! write to one row never throws away edits on another.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Order, OrderChange};
use crate::types::{FieldErrors, NoteId, OrderId, OrderStatus};
use crate::view::filter::{Faceted, Filter, filter_by};

/// An entity that can be edited through a [`TableState`].
pub trait Editable: Clone + Send + Sync {
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;
    /// The editable projection of the entity.
    type Draft: Clone + PartialEq + fmt::Debug + Send + Sync;
    /// One user edit.
    type Change: Send;
    /// What a save writes to the store.
    type Commit: Send + Sync;

    fn id(&self) -> Self::Id;

    fn version(&self) -> i32;

    /// The entity's current values as a fresh draft.
    fn draft(&self) -> Self::Draft;

    /// Apply one edit to a draft.
    ///
    /// # Errors
    ///
    /// Returns a [`ChangeError`] when the edit is not meaningful for the draft.
    fn apply_change(draft: &mut Self::Draft, change: Self::Change) -> Result<(), ChangeError>;

    /// Build the write for `draft` on top of this entity.
    ///
    /// # Errors
    ///
    /// Returns per-field messages when the draft does not validate.
    fn commit(&self, draft: &Self::Draft, now: DateTime<Utc>) -> Result<Self::Commit, FieldErrors>;
}

/// An edit that cannot be applied to a draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    #[error("note content cannot be empty")]
    EmptyNote,
    #[error("note {0} is not on this order")]
    UnknownNote(String),
}

/// Errors from table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("row {0} is not in the current list")]
    UnknownRow(String),
    #[error("row {0} has no unsaved changes")]
    NothingToSave(String),
    #[error("a save for row {0} is already in progress")]
    SaveInFlight(String),
    #[error("row {0} was changed by someone else; resolve the conflict first")]
    Conflict(String),
    #[error("row {0} has no conflict to resolve")]
    NoConflict(String),
    #[error("row {0} is older than the conflicting server copy; reload it first")]
    Stale(String),
    #[error("deleting requires confirmation")]
    ConfirmationRequired,
    #[error(transparent)]
    Change(#[from] ChangeError),
    #[error("validation failed: {0}")]
    Invalid(FieldErrors),
}

/// Externally visible state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Clean,
    Dirty,
    Saving,
    Conflict,
}

/// How to settle a conflicted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Keep the local draft and retarget it at the newest server version.
    KeepMine,
    /// Drop the local draft.
    TakeTheirs,
}

/// Why a save did not land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFailure {
    /// The stored row moved past the expected version.
    Conflict { server_version: i32 },
    /// The row no longer exists.
    Gone,
    /// Anything else; the draft is kept for a retry.
    Other,
}

/// A save handed to the caller to write.
#[derive(Debug, Clone)]
pub struct PendingSave<E: Editable> {
    pub id: E::Id,
    /// The version the draft was based on; the store must still be at it.
    pub expected_version: i32,
    pub commit: E::Commit,
}

/// What a snapshot did to the edit buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport<Id> {
    /// Buffers dropped because their row disappeared.
    pub dropped: Vec<Id>,
    /// Buffers dropped because the server now holds the same values.
    pub settled: Vec<Id>,
    /// Rows that moved into conflict.
    pub conflicted: Vec<Id>,
}

impl<Id> Default for ReconcileReport<Id> {
    fn default() -> Self {
        Self {
            dropped: Vec::new(),
            settled: Vec::new(),
            conflicted: Vec::new(),
        }
    }
}

impl<Id> ReconcileReport<Id> {
    /// True when no buffer was touched.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.dropped.is_empty() && self.settled.is_empty() && self.conflicted.is_empty()
    }
}

/// One rendered row.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "E: Serialize, E::Id: Serialize, E::Draft: Serialize"))]
pub struct RowView<'a, E: Editable> {
    pub id: E::Id,
    pub state: RowState,
    pub expanded: bool,
    /// The row as the server last reported it.
    pub server: &'a E,
    /// The values to display: the draft when one exists, else the server's.
    pub current: E::Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dirty,
    Saving,
    Conflict { server_version: i32 },
}

#[derive(Debug, Clone)]
struct EditBuffer<D> {
    base_version: i32,
    draft: D,
    phase: Phase,
}

/// View-state for one list.
#[derive(Debug, Clone)]
pub struct TableState<E: Editable + Faceted> {
    rows: Vec<E>,
    edits: HashMap<E::Id, EditBuffer<E::Draft>>,
    expanded: HashSet<E::Id>,
    filter: Filter<E::Facet>,
}

impl<E: Editable + Faceted> TableState<E> {
    /// An empty table with the given initial filter.
    #[must_use]
    pub fn new(filter: Filter<E::Facet>) -> Self {
        Self {
            rows: Vec::new(),
            edits: HashMap::new(),
            expanded: HashSet::new(),
            filter,
        }
    }

    /// The last snapshot, in server order.
    #[must_use]
    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    #[must_use]
    pub fn filter(&self) -> Filter<E::Facet> {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter<E::Facet>) {
        self.filter = filter;
    }

    #[must_use]
    pub fn is_expanded(&self, id: E::Id) -> bool {
        self.expanded.contains(&id)
    }

    /// The row's state, or `None` if the row is not in the snapshot.
    #[must_use]
    pub fn state_of(&self, id: E::Id) -> Option<RowState> {
        self.find(id).ok()?;
        Some(self.edits.get(&id).map_or(RowState::Clean, |buf| match buf.phase {
            Phase::Dirty => RowState::Dirty,
            Phase::Saving => RowState::Saving,
            Phase::Conflict { .. } => RowState::Conflict,
        }))
    }

    /// The pending draft for a row, if it has one.
    #[must_use]
    pub fn draft_of(&self, id: E::Id) -> Option<&E::Draft> {
        self.edits.get(&id).map(|buf| &buf.draft)
    }

    /// Rows passing the active filter, with their edit state.
    ///
    /// Filtering looks at the server values, not at drafts.
    #[must_use]
    pub fn view(&self) -> Vec<RowView<'_, E>> {
        filter_by(&self.rows, self.filter)
            .into_iter()
            .map(|row| {
                let id = row.id();
                let draft = self.draft_of(id);
                RowView {
                    id,
                    state: self.state_of(id).unwrap_or(RowState::Clean),
                    expanded: self.expanded.contains(&id),
                    server: row,
                    current: draft.cloned().unwrap_or_else(|| row.draft()),
                }
            })
            .collect()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Replace the snapshot and reconcile every edit buffer against it.
    pub fn apply_snapshot(&mut self, rows: Vec<E>) -> ReconcileReport<E::Id> {
        let mut report = ReconcileReport::default();
        {
            let by_id: HashMap<E::Id, &E> = rows.iter().map(|row| (row.id(), row)).collect();

            self.edits.retain(|id, buf| {
                let Some(row) = by_id.get(id) else {
                    report.dropped.push(*id);
                    return false;
                };
                if row.version() <= buf.base_version {
                    return true;
                }
                if row.draft() == buf.draft {
                    report.settled.push(*id);
                    return false;
                }
                match buf.phase {
                    // The save's own outcome decides.
                    Phase::Saving => {}
                    Phase::Dirty => {
                        buf.phase = Phase::Conflict {
                            server_version: row.version(),
                        };
                        report.conflicted.push(*id);
                    }
                    Phase::Conflict { server_version } if server_version < row.version() => {
                        buf.phase = Phase::Conflict {
                            server_version: row.version(),
                        };
                        report.conflicted.push(*id);
                    }
                    Phase::Conflict { .. } => {}
                }
                true
            });

            self.expanded.retain(|id| by_id.contains_key(id));
        }
        self.rows = rows;
        report
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Open or close a row's detail panel; returns whether it is now open.
    ///
    /// Closing discards the row's uncommitted draft. A save already in flight
    /// is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownRow`] if the row is not in the snapshot.
    pub fn toggle_expand(&mut self, id: E::Id) -> Result<bool, TableError> {
        self.find(id)?;
        if self.expanded.remove(&id) {
            if self
                .edits
                .get(&id)
                .is_some_and(|buf| buf.phase != Phase::Saving)
            {
                self.edits.remove(&id);
            }
            Ok(false)
        } else {
            self.expanded.insert(id);
            Ok(true)
        }
    }

    /// Apply one edit to the row's draft, creating the draft if needed.
    ///
    /// Nothing is written to the store. A draft edited back to the server's
    /// values is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownRow`], [`TableError::SaveInFlight`], or the
    /// change's own error. On error the draft is unchanged.
    pub fn field_change(&mut self, id: E::Id, change: E::Change) -> Result<(), TableError> {
        let row = self
            .rows
            .iter()
            .find(|row| row.id() == id)
            .ok_or_else(|| TableError::UnknownRow(id.to_string()))?;

        let mut buf = match self.edits.get(&id) {
            Some(buf) if buf.phase == Phase::Saving => {
                return Err(TableError::SaveInFlight(id.to_string()));
            }
            Some(buf) => buf.clone(),
            None => EditBuffer {
                base_version: row.version(),
                draft: row.draft(),
                phase: Phase::Dirty,
            },
        };
        E::apply_change(&mut buf.draft, change)?;

        if buf.phase == Phase::Dirty && buf.draft == row.draft() {
            self.edits.remove(&id);
        } else {
            self.edits.insert(id, buf);
        }
        Ok(())
    }

    /// Turn the row's draft into a write and mark the row as saving.
    ///
    /// # Errors
    ///
    /// - [`TableError::NothingToSave`] if the row has no draft
    /// - [`TableError::SaveInFlight`] if a save is already running
    /// - [`TableError::Conflict`] if the row must be resolved first
    /// - [`TableError::Invalid`] if the draft does not validate
    pub fn save_changes(
        &mut self,
        id: E::Id,
        now: DateTime<Utc>,
    ) -> Result<PendingSave<E>, TableError> {
        let row = self
            .rows
            .iter()
            .find(|row| row.id() == id)
            .ok_or_else(|| TableError::UnknownRow(id.to_string()))?;
        let buf = self
            .edits
            .get_mut(&id)
            .ok_or_else(|| TableError::NothingToSave(id.to_string()))?;

        match buf.phase {
            Phase::Saving => return Err(TableError::SaveInFlight(id.to_string())),
            Phase::Conflict { .. } => return Err(TableError::Conflict(id.to_string())),
            Phase::Dirty => {}
        }

        let commit = row.commit(&buf.draft, now).map_err(TableError::Invalid)?;
        buf.phase = Phase::Saving;
        Ok(PendingSave {
            id,
            expected_version: buf.base_version,
            commit,
        })
    }

    /// Record a successful save: the draft goes away and the stored copy
    /// replaces the row unless a newer one has already arrived.
    pub fn complete_save(&mut self, saved: E) {
        let id = saved.id();
        self.edits.remove(&id);
        if let Some(row) = self.rows.iter_mut().find(|row| row.id() == id) {
            if saved.version() >= row.version() {
                *row = saved;
            }
        }
    }

    /// Record a failed save. The draft is never rolled back.
    pub fn fail_save(&mut self, id: E::Id, failure: SaveFailure) {
        match failure {
            SaveFailure::Gone => self.forget(id),
            SaveFailure::Conflict { server_version } => {
                if let Some(buf) = self.saving_mut(id) {
                    buf.phase = Phase::Conflict { server_version };
                }
            }
            SaveFailure::Other => {
                if let Some(buf) = self.saving_mut(id) {
                    buf.phase = Phase::Dirty;
                }
            }
        }
    }

    /// Settle a conflicted row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NoConflict`] if the row is not in conflict, or
    /// [`TableError::Stale`] when keeping the draft while the snapshot is
    /// still older than the version the save collided with.
    pub fn resolve_conflict(
        &mut self,
        id: E::Id,
        resolution: ConflictResolution,
    ) -> Result<RowState, TableError> {
        let Some(buf) = self.edits.get_mut(&id) else {
            return Err(TableError::NoConflict(id.to_string()));
        };
        let Phase::Conflict { server_version } = buf.phase else {
            return Err(TableError::NoConflict(id.to_string()));
        };

        match resolution {
            ConflictResolution::KeepMine => {
                let row = self
                    .rows
                    .iter()
                    .find(|row| row.id() == id)
                    .ok_or_else(|| TableError::UnknownRow(id.to_string()))?;
                // The commit is built against this row, so it must be the
                // copy the draft is meant to overwrite.
                if row.version() < server_version {
                    return Err(TableError::Stale(id.to_string()));
                }
                buf.base_version = row.version();
                buf.phase = Phase::Dirty;
                Ok(RowState::Dirty)
            }
            ConflictResolution::TakeTheirs => {
                self.edits.remove(&id);
                Ok(RowState::Clean)
            }
        }
    }

    /// Check that a delete may proceed.
    ///
    /// Deletes bypass the edit buffer and need an explicit confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ConfirmationRequired`] when `confirmed` is false,
    /// or [`TableError::UnknownRow`].
    pub fn delete_entity(&self, id: E::Id, confirmed: bool) -> Result<E::Id, TableError> {
        self.find(id)?;
        if confirmed {
            Ok(id)
        } else {
            Err(TableError::ConfirmationRequired)
        }
    }

    /// Remove a deleted row and everything attached to it.
    pub fn complete_delete(&mut self, id: E::Id) {
        self.forget(id);
    }

    fn saving_mut(&mut self, id: E::Id) -> Option<&mut EditBuffer<E::Draft>> {
        self.edits
            .get_mut(&id)
            .filter(|buf| buf.phase == Phase::Saving)
    }

    fn forget(&mut self, id: E::Id) {
        self.rows.retain(|row| row.id() != id);
        self.edits.remove(&id);
        self.expanded.remove(&id);
    }

    fn find(&self, id: E::Id) -> Result<&E, TableError> {
        self.rows
            .iter()
            .find(|row| row.id() == id)
            .ok_or_else(|| TableError::UnknownRow(id.to_string()))
    }
}

/// Order-specific shorthands over [`TableState::field_change`].
impl TableState<Order> {
    /// Stage a status change; `shipped_at` is worked out on save.
    ///
    /// # Errors
    ///
    /// See [`TableState::field_change`].
    pub fn status_change(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), TableError> {
        self.field_change(id, OrderChange::Status(status))
    }

    /// Stage a new note; committed with the next save.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::EmptyNote`] (wrapped) for blank content.
    pub fn add_note(&mut self, id: OrderId, content: &str) -> Result<(), TableError> {
        self.field_change(id, OrderChange::AddNote(content.to_owned()))
    }

    /// Stage a note's resolved flag; committed with the next save.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::UnknownNote`] (wrapped) for a note not on the order.
    pub fn set_note_resolved(
        &mut self,
        id: OrderId,
        note: NoteId,
        resolved: bool,
    ) -> Result<(), TableError> {
        self.field_change(id, OrderChange::SetNoteResolved { note, resolved })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::order::tests::{at, order};
    use crate::models::{Note, ShippedAtChange};

    fn table(orders: Vec<Order>) -> TableState<Order> {
        let mut table = TableState::new(Filter::All);
        table.apply_snapshot(orders);
        table
    }

    fn bumped(mut order: Order) -> Order {
        order.version += 1;
        order
    }

    const A: OrderId = OrderId::new(1);
    const B: OrderId = OrderId::new(2);

    #[test]
    fn test_field_change_only_touches_draft() {
        let mut t = table(vec![order(1, OrderStatus::New), order(2, OrderStatus::New)]);
        t.field_change(A, OrderChange::ShippingCompany("DHL".into()))
            .unwrap();

        assert_eq!(t.state_of(A), Some(RowState::Dirty));
        assert_eq!(t.state_of(B), Some(RowState::Clean));
        assert_eq!(t.draft_of(A).unwrap().shipping_company, "DHL");
        assert_eq!(t.rows()[0].shipping_company, None);
    }

    #[test]
    fn test_editing_back_to_server_values_is_clean() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.status_change(A, OrderStatus::Issue).unwrap();
        t.status_change(A, OrderStatus::New).unwrap();
        assert_eq!(t.state_of(A), Some(RowState::Clean));
    }

    #[test]
    fn test_unchanged_snapshot_keeps_drafts() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();

        let report = t.apply_snapshot(vec![order(1, OrderStatus::New)]);
        assert!(report.is_quiet());
        assert_eq!(t.draft_of(A).unwrap().driver, "Sam");
    }

    #[test]
    fn test_save_then_matching_snapshot_is_clean() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();
        let pending = t.save_changes(A, at(10)).unwrap();
        assert_eq!(pending.expected_version, 1);
        assert_eq!(t.state_of(A), Some(RowState::Saving));

        let mut stored = bumped(order(1, OrderStatus::New));
        stored.driver = Some("Sam".into());
        let report = t.apply_snapshot(vec![stored]);

        assert_eq!(report.settled, vec![A]);
        assert_eq!(t.state_of(A), Some(RowState::Clean));
    }

    #[test]
    fn test_complete_save_replaces_row() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.field_change(A, OrderChange::ShippingCompany("Aramex".into()))
            .unwrap();
        t.save_changes(A, at(10)).unwrap();

        let mut stored = bumped(order(1, OrderStatus::New));
        stored.shipping_company = Some("Aramex".into());
        t.complete_save(stored);

        assert_eq!(t.state_of(A), Some(RowState::Clean));
        assert_eq!(t.rows()[0].version, 2);
        assert_eq!(t.rows()[0].shipping_company.as_deref(), Some("Aramex"));
    }

    #[test]
    fn test_remote_write_conflicts_only_that_row() {
        let mut t = table(vec![order(1, OrderStatus::New), order(2, OrderStatus::New)]);
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();
        t.field_change(B, OrderChange::Driver("Lee".into())).unwrap();

        let mut remote = bumped(order(1, OrderStatus::New));
        remote.driver = Some("Someone else".into());
        let report = t.apply_snapshot(vec![remote, order(2, OrderStatus::New)]);

        assert_eq!(report.conflicted, vec![A]);
        assert_eq!(t.state_of(A), Some(RowState::Conflict));
        assert_eq!(t.draft_of(A).unwrap().driver, "Sam");
        assert_eq!(t.state_of(B), Some(RowState::Dirty));
        assert_eq!(t.draft_of(B).unwrap().driver, "Lee");
    }

    #[test]
    fn test_conflict_blocks_save_until_resolved() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();
        let mut remote = bumped(order(1, OrderStatus::New));
        remote.status = OrderStatus::Prepared;
        t.apply_snapshot(vec![remote]);

        assert_eq!(
            t.save_changes(A, at(10)).unwrap_err(),
            TableError::Conflict("1".into())
        );

        assert_eq!(
            t.resolve_conflict(A, ConflictResolution::KeepMine).unwrap(),
            RowState::Dirty
        );
        let pending = t.save_changes(A, at(10)).unwrap();
        assert_eq!(pending.expected_version, 2);
    }

    #[test]
    fn test_keep_mine_waits_for_the_newer_row() {
        let mut t = table(vec![order(1, OrderStatus::Shipped)]);
        t.status_change(A, OrderStatus::Delivered).unwrap();
        t.save_changes(A, at(10)).unwrap();
        // The store refused the write before its snapshot reached us
        t.fail_save(A, SaveFailure::Conflict { server_version: 2 });

        assert_eq!(
            t.resolve_conflict(A, ConflictResolution::KeepMine),
            Err(TableError::Stale("1".into()))
        );
        assert_eq!(t.state_of(A), Some(RowState::Conflict));

        let mut remote = bumped(order(1, OrderStatus::Shipped));
        remote.driver = Some("Someone else".into());
        t.apply_snapshot(vec![remote]);
        assert_eq!(t.state_of(A), Some(RowState::Conflict));

        assert_eq!(
            t.resolve_conflict(A, ConflictResolution::KeepMine).unwrap(),
            RowState::Dirty
        );
        let pending = t.save_changes(A, at(11)).unwrap();
        assert_eq!(pending.expected_version, 2);
        assert_eq!(pending.commit.update.status, OrderStatus::Delivered);
        assert_eq!(pending.commit.update.shipped_at, ShippedAtChange::Clear);
    }

    #[test]
    fn test_take_theirs_drops_draft() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();
        t.fail_save(A, SaveFailure::Conflict { server_version: 2 });
        assert_eq!(t.state_of(A), Some(RowState::Dirty));

        t.save_changes(A, at(10)).unwrap();
        t.fail_save(A, SaveFailure::Conflict { server_version: 2 });
        assert_eq!(t.state_of(A), Some(RowState::Conflict));

        t.resolve_conflict(A, ConflictResolution::TakeTheirs).unwrap();
        assert_eq!(t.state_of(A), Some(RowState::Clean));
        assert!(matches!(
            t.resolve_conflict(A, ConflictResolution::TakeTheirs),
            Err(TableError::NoConflict(_))
        ));
    }

    #[test]
    fn test_failed_save_keeps_draft() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();
        t.save_changes(A, at(10)).unwrap();
        assert!(matches!(
            t.field_change(A, OrderChange::Driver("Max".into())),
            Err(TableError::SaveInFlight(_))
        ));

        t.fail_save(A, SaveFailure::Other);
        assert_eq!(t.state_of(A), Some(RowState::Dirty));
        assert_eq!(t.draft_of(A).unwrap().driver, "Sam");
    }

    #[test]
    fn test_save_without_draft() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        assert_eq!(
            t.save_changes(A, at(10)).unwrap_err(),
            TableError::NothingToSave("1".into())
        );
        assert!(matches!(
            t.save_changes(OrderId::new(9), at(10)),
            Err(TableError::UnknownRow(_))
        ));
    }

    #[test]
    fn test_collapse_discards_draft() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        assert!(t.toggle_expand(A).unwrap());
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();

        assert!(!t.toggle_expand(A).unwrap());
        assert_eq!(t.state_of(A), Some(RowState::Clean));
        assert!(t.draft_of(A).is_none());
    }

    #[test]
    fn test_collapse_keeps_inflight_save() {
        let mut t = table(vec![order(1, OrderStatus::New)]);
        t.toggle_expand(A).unwrap();
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();
        t.save_changes(A, at(10)).unwrap();

        t.toggle_expand(A).unwrap();
        assert_eq!(t.state_of(A), Some(RowState::Saving));
    }

    #[test]
    fn test_row_removed_remotely_drops_buffer() {
        let mut t = table(vec![order(1, OrderStatus::New), order(2, OrderStatus::New)]);
        t.toggle_expand(A).unwrap();
        t.field_change(A, OrderChange::Driver("Sam".into())).unwrap();

        let report = t.apply_snapshot(vec![order(2, OrderStatus::New)]);
        assert_eq!(report.dropped, vec![A]);
        assert_eq!(t.state_of(A), None);
        assert!(!t.is_expanded(A));
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut t = table(vec![order(1, OrderStatus::New), order(2, OrderStatus::New)]);
        assert_eq!(
            t.delete_entity(A, false).unwrap_err(),
            TableError::ConfirmationRequired
        );
        assert_eq!(t.delete_entity(A, true).unwrap(), A);

        t.complete_delete(A);
        let ids: Vec<OrderId> = t.view().iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![B]);
    }

    #[test]
    fn test_view_filters_on_server_status() {
        let mut t = table(vec![order(1, OrderStatus::New), order(2, OrderStatus::Shipped)]);
        t.set_filter(Filter::Only(OrderStatus::New));
        t.status_change(A, OrderStatus::Delivered).unwrap();

        let view = t.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, A);
        assert_eq!(view[0].state, RowState::Dirty);
        assert_eq!(view[0].current.status, OrderStatus::Delivered);
        assert_eq!(view[0].server.status, OrderStatus::New);
    }

    #[test]
    fn test_ship_then_unship_scenario() {
        let mut t = table(vec![order(1, OrderStatus::New)]);

        t.status_change(A, OrderStatus::Shipped).unwrap();
        let pending = t.save_changes(A, at(10)).unwrap();
        assert_eq!(pending.commit.update.status, OrderStatus::Shipped);
        assert_eq!(pending.commit.update.shipped_at, ShippedAtChange::Set(at(10)));

        let mut stored = t.rows()[0].clone();
        pending.commit.update.apply_to(&mut stored);
        stored.version += 1;
        t.complete_save(stored);

        t.status_change(A, OrderStatus::Prepared).unwrap();
        let pending = t.save_changes(A, at(12)).unwrap();
        assert_eq!(pending.expected_version, 2);
        assert_eq!(pending.commit.update.shipped_at, ShippedAtChange::Clear);
        let json = serde_json::to_value(&pending.commit.update).unwrap();
        assert_eq!(json["status"], "Prepared");
        assert!(json["shipped_at"].is_null());
    }

    #[test]
    fn test_notes_share_the_save() {
        let mut stored = order(1, OrderStatus::New);
        stored.notes.push(Note {
            id: NoteId::new(4),
            content: "leave at door".into(),
            created_at: at(8),
            resolved: false,
        });
        let mut t = table(vec![stored]);

        t.add_note(A, "customer called").unwrap();
        t.set_note_resolved(A, NoteId::new(4), true).unwrap();
        assert!(matches!(
            t.add_note(A, "  "),
            Err(TableError::Change(ChangeError::EmptyNote))
        ));

        let pending = t.save_changes(A, at(10)).unwrap();
        assert_eq!(pending.commit.new_notes.len(), 1);
        assert_eq!(pending.commit.note_resolutions, vec![(NoteId::new(4), true)]);
        assert_eq!(pending.commit.update.shipped_at, ShippedAtChange::Keep);
    }
}
