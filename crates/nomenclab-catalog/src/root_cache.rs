//! Single-flight cache of the full Analysis collection.
//!
//! The collection is fetched page 0 first to learn the page count, then
//! the remaining pages concurrently. Reassembly is strictly by page index,
//! so network completion order never changes the result. Any page failure
//! fails the whole fetch and leaves the cache empty; it is never partially
//! populated.

use std::sync::Arc;

use futures_util::future::try_join_all;
use indexmap::IndexMap;

use nomenclab_core::{Analysis, EntityId, RemoteError, SortSpec};
use nomenclab_gateway::CatalogGateway;

use crate::error::Result;
use crate::single_flight::SingleFlightCell;

/// Immutable snapshot of the deduplicated Analysis collection.
pub type AnalysisSnapshot = Arc<Vec<Analysis>>;

/// Memoized handle to the full Analysis collection.
pub struct RootCache {
    gateway: Arc<dyn CatalogGateway>,
    page_size: u32,
    sort: SortSpec,
    cell: SingleFlightCell<Vec<Analysis>>,
}

impl RootCache {
    pub fn new(gateway: Arc<dyn CatalogGateway>, page_size: u32) -> Self {
        Self {
            gateway,
            page_size,
            sort: SortSpec::default(),
            cell: SingleFlightCell::new(),
        }
    }

    /// The full collection, shared by all concurrent callers.
    ///
    /// # Errors
    ///
    /// Fails if any page fetch fails; the cache stays empty and the next
    /// call restarts from page 0.
    pub async fn get_all(&self) -> Result<AnalysisSnapshot> {
        let gateway = self.gateway.clone();
        let page_size = self.page_size;
        let sort = self.sort.clone();
        let snapshot = self
            .cell
            .get_or_fetch(fetch_all(gateway, page_size, sort))
            .await?;
        Ok(snapshot)
    }

    /// Point lookup, never cached: detail views read server truth.
    pub async fn get_by_id(&self, id: EntityId) -> Result<Analysis> {
        Ok(self.gateway.analysis_by_id(id).await?)
    }

    /// Drop the memoized handle unconditionally.
    pub fn invalidate(&self) {
        tracing::debug!("analysis root cache invalidated");
        self.cell.invalidate();
    }

    /// Invalidate, then fetch fresh.
    pub async fn refresh(&self) -> Result<AnalysisSnapshot> {
        self.invalidate();
        self.get_all().await
    }
}

async fn fetch_all(
    gateway: Arc<dyn CatalogGateway>,
    page_size: u32,
    sort: SortSpec,
) -> std::result::Result<Vec<Analysis>, RemoteError> {
    let first = gateway.analysis_page(0, page_size, &sort, &[]).await?;
    let total_pages = first.total_pages;

    let mut pages: Vec<Vec<Analysis>> = Vec::with_capacity(total_pages.max(1) as usize);
    pages.push(first.content);

    if total_pages > 1 {
        // Remaining pages fetched concurrently; try_join_all returns them
        // in input order, which is page-index order.
        let rest = try_join_all((1..total_pages).map(|page| {
            let gateway = gateway.clone();
            let sort = sort.clone();
            async move { gateway.analysis_page(page, page_size, &sort, &[]).await }
        }))
        .await?;
        pages.extend(rest.into_iter().map(|page| page.content));
    }

    // Deduplicate by id, first occurrence wins.
    let mut by_id: IndexMap<EntityId, Analysis> = IndexMap::new();
    for analysis in pages.into_iter().flatten() {
        by_id.entry(analysis.id).or_insert(analysis);
    }

    tracing::debug!(
        pages = total_pages,
        analyses = by_id.len(),
        "analysis collection assembled"
    );
    Ok(by_id.into_values().collect())
}
