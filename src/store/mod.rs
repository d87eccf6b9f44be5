//! Record store abstraction.
//!
//! The store is the managed data layer that owns every record. framedex only
//! needs four calls from it, captured by [`RecordStore`]:
//!
//! | Call | Used by |
//! |------|---------|
//! | `list` | [`fetch_all`] (cursor pagination) |
//! | `create` | row importer |
//! | `delete` | replace-all reconciliation |
//! | `get` | single-record lookups outside the import engine |
//!
//! # Backends
//!
//! | Backend | Persistence | Notes |
//! |---------|-------------|-------|
//! | [`MemoryStore`] | process lifetime | tests, dry runs |
//! | [`FileStore`] | JSON snapshot per kind | offline editing |
//! | [`GraphqlStore`] | managed GraphQL API | production |
//!
//! A store is constructed once at start-up ([`build_store`]) and passed to the
//! services that need it.

mod file;
mod graphql;
mod memory;

pub use file::FileStore;
pub use graphql::GraphqlStore;
pub use memory::MemoryStore;

use crate::config::{StoreBackend, StoreSettings};
use crate::models::{RecordFields, RecordId, RecordKind, StoredRecord};
use crate::observability::metrics;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Page size used when fetching whole collections.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Request for one page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Continuation cursor from the previous page; `None` for the first page.
    pub cursor: Option<String>,
    /// Maximum number of items to return.
    pub page_size: usize,
}

impl PageRequest {
    /// Creates a request for the first page.
    #[must_use]
    pub const fn first(page_size: usize) -> Self {
        Self {
            cursor: None,
            page_size,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records on this page, in server order.
    pub items: Vec<StoredRecord>,
    /// Cursor for the next page; `None` when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Capability consumed from the managed data layer, per record kind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Lists one page of records of a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the cursor is invalid.
    async fn list(&self, kind: RecordKind, request: PageRequest) -> Result<Page>;

    /// Creates a record and returns it with its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the record.
    async fn create(&self, fields: RecordFields) -> Result<StoredRecord>;

    /// Deletes a record by identifier, returning the deleted record if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>>;

    /// Retrieves a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    async fn get(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>>;
}

/// Progress notification emitted while paging.
#[derive(Debug, Clone, Copy)]
pub struct FetchProgress {
    /// Kind being fetched.
    pub kind: RecordKind,
    /// 1-based number of the page about to be requested.
    pub page: usize,
    /// Records fetched so far.
    pub fetched: usize,
}

/// Observer for [`fetch_all`] progress.
pub type FetchObserver<'a> = &'a (dyn Fn(&FetchProgress) + Send + Sync);

/// Fetches the complete collection of a kind by following cursors.
///
/// Starts without a cursor and stops at the first page that returns none
/// (an empty cursor counts as none).
///
/// # Errors
///
/// Any failed page aborts the fetch; no partial result is returned.
#[tracing::instrument(skip(store, observer), fields(store = store.name()))]
pub async fn fetch_all(
    store: &dyn RecordStore,
    kind: RecordKind,
    page_size: usize,
    observer: Option<FetchObserver<'_>>,
) -> Result<Vec<StoredRecord>> {
    let mut items = Vec::new();
    let mut cursor = None;
    let mut page = 0;

    loop {
        page += 1;
        if let Some(observe) = observer {
            observe(&FetchProgress {
                kind,
                page,
                fetched: items.len(),
            });
        }

        let result = store.list(kind, PageRequest { cursor, page_size }).await?;
        metrics::record_page(kind);
        tracing::debug!(page, returned = result.items.len(), "fetched page");

        items.extend(result.items);
        cursor = result.next_cursor.filter(|c| !c.is_empty());
        if cursor.is_none() {
            break;
        }
    }

    tracing::info!(pages = page, total = items.len(), "fetched collection");
    Ok(items)
}

/// Builds the configured store backend.
///
/// # Errors
///
/// Returns an error if the backend is misconfigured or cannot be opened.
pub fn build_store(settings: &StoreSettings) -> Result<Arc<dyn RecordStore>> {
    match settings.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::open(&settings.data_dir)?)),
        StoreBackend::Graphql => {
            let endpoint = settings.endpoint.clone().ok_or_else(|| {
                Error::InvalidInput(
                    "graphql backend requires store.endpoint (or FRAMEDEX_ENDPOINT)".to_string(),
                )
            })?;
            let api_key = settings.api_key.clone().ok_or_else(|| {
                Error::InvalidInput(
                    "graphql backend requires store.api_key (or FRAMEDEX_API_KEY)".to_string(),
                )
            })?;
            Ok(Arc::new(GraphqlStore::new(
                endpoint,
                api_key,
                Duration::from_secs(settings.timeout_secs),
            )?))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoveCategory;
    use std::sync::Mutex;

    fn category(key: &str) -> RecordFields {
        RecordFields::MoveCategory(MoveCategory {
            move_category_id: key.to_string(),
            move_category: key.to_uppercase(),
        })
    }

    #[tokio::test]
    async fn test_fetch_all_follows_cursors() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store.create(category(&format!("c{i}"))).await.unwrap();
        }

        let pages = Mutex::new(Vec::new());
        let observer = |p: &FetchProgress| pages.lock().unwrap().push(p.page);
        let all = fetch_all(&store, RecordKind::MoveCategory, 3, Some(&observer))
            .await
            .unwrap();

        assert_eq!(all.len(), 7);
        assert_eq!(all[0].natural_key(), Some("c0"));
        assert_eq!(all[6].natural_key(), Some("c6"));
        assert_eq!(*pages.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_collection() {
        let store = MemoryStore::new();
        let all = fetch_all(&store, RecordKind::Character, DEFAULT_PAGE_SIZE, None)
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    /// Serves one page of categories and always hands back an empty cursor.
    #[derive(Default)]
    struct EmptyCursorStore {
        cursors: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl RecordStore for EmptyCursorStore {
        fn name(&self) -> &'static str {
            "empty-cursor"
        }

        async fn list(&self, kind: RecordKind, request: PageRequest) -> Result<Page> {
            let mut cursors = self.cursors.lock().unwrap();
            cursors.push(request.cursor);
            if cursors.len() > 3 {
                return Err(Error::store("list", kind, "paging did not stop"));
            }
            Ok(Page {
                items: vec![StoredRecord::new(RecordId::new("1"), category("normal"))],
                next_cursor: Some(String::new()),
            })
        }

        async fn create(&self, fields: RecordFields) -> Result<StoredRecord> {
            Ok(StoredRecord::new(RecordId::generate(), fields))
        }

        async fn delete(&self, _kind: RecordKind, _id: &RecordId) -> Result<Option<StoredRecord>> {
            Ok(None)
        }

        async fn get(&self, _kind: RecordKind, _id: &RecordId) -> Result<Option<StoredRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_empty_cursor() {
        let store = EmptyCursorStore::default();
        let all = fetch_all(&store, RecordKind::MoveCategory, 10, None)
            .await
            .unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(*store.cursors.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_build_graphql_requires_endpoint() {
        let settings = StoreSettings {
            backend: StoreBackend::Graphql,
            ..StoreSettings::default()
        };
        assert!(build_store(&settings).is_err());
    }
}
