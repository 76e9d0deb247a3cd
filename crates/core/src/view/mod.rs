//! List view-state: facet filtering and buffered row editing.
//!
//! Nothing in here performs I/O. The server feeds snapshots in, forwards
//! user operations, and carries the resulting commits to the store.

pub mod filter;
pub mod table;

pub use filter::{Faceted, Filter, filter_by};
pub use table::{
    ChangeError, ConflictResolution, Editable, PendingSave, ReconcileReport, RowState, RowView,
    SaveFailure, TableError, TableState,
};
