//! Store statistics.
//!
//! Counts every collection by paging through it, one fetch per kind, all
//! kinds concurrently.

use crate::models::RecordKind;
use crate::store::{RecordStore, fetch_all};
use crate::Result;
use futures::future::try_join_all;
use std::sync::Arc;

/// Record count for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindCount {
    /// Record kind.
    pub kind: RecordKind,
    /// Records currently stored.
    pub count: usize,
}

/// Per-kind record counts, in [`RecordKind::all`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// One entry per kind.
    pub counts: Vec<KindCount>,
}

impl StoreStats {
    /// Returns the count for a kind (0 if absent).
    #[must_use]
    pub fn count(&self, kind: RecordKind) -> usize {
        self.counts
            .iter()
            .find(|c| c.kind == kind)
            .map_or(0, |c| c.count)
    }

    /// Returns the number of records across every kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }
}

/// Service for collecting store statistics.
pub struct StatsService {
    store: Arc<dyn RecordStore>,
}

impl StatsService {
    /// Creates a new stats service.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Counts every record kind.
    ///
    /// # Errors
    ///
    /// Returns the first failed fetch; no partial statistics are returned.
    #[tracing::instrument(skip(self), fields(store = self.store.name()))]
    pub async fn collect(&self, page_size: usize) -> Result<StoreStats> {
        let fetches = RecordKind::all().iter().map(|kind| async move {
            let records = fetch_all(self.store.as_ref(), *kind, page_size, None).await?;
            Ok::<_, crate::Error>(KindCount {
                kind: *kind,
                count: records.len(),
            })
        });
        let counts = try_join_all(fetches).await?;
        Ok(StoreStats { counts })
    }
}
