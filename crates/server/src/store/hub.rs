//! Change notifications for live collections.
//!
//! Every write bumps a revision counter on the collection it touched.
//! Workspaces compare revisions to decide whether to refetch, and the SSE
//! route waits on the counters to push fresh snapshots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use rabit_core::BrandId;

/// A live collection that clients can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Brands,
    Products(BrandId),
    Orders(BrandId),
}

/// Revision counters keyed by collection.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHub {
    channels: Arc<Mutex<HashMap<Collection, watch::Sender<u64>>>>,
}

impl SnapshotHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision of a collection; 0 until its first write.
    #[must_use]
    pub fn revision(&self, collection: Collection) -> u64 {
        *self.sender(collection).borrow()
    }

    /// Watch a collection's revision.
    #[must_use]
    pub fn subscribe(&self, collection: Collection) -> watch::Receiver<u64> {
        self.sender(collection).subscribe()
    }

    /// Mark a collection as changed.
    pub fn publish(&self, collection: Collection) {
        let sender = self.sender(collection);
        sender.send_modify(|revision| *revision += 1);
        tracing::debug!(?collection, revision = *sender.borrow(), "collection changed");
    }

    fn sender(&self, collection: Collection) -> watch::Sender<u64> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(collection)
            .or_insert_with(|| watch::Sender::new(0))
            .clone()
    }
}
