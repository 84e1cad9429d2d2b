//! Memoized map of nomenclature versions to their NBU membership.
//!
//! Sourced from the detail endpoint that embeds each version's NBU list.
//! Independent of the root cache; destroyed on any association change and
//! on version create/update.

use std::collections::BTreeSet;
use std::sync::Arc;

use nomenclab_core::{EntityId, NomenclatureVersion};
use nomenclab_gateway::CatalogGateway;

use crate::error::{CatalogError, Result};
use crate::single_flight::SingleFlightCell;

/// Single-flight cache of the version detail records.
pub struct VersionDetailCache {
    gateway: Arc<dyn CatalogGateway>,
    cell: SingleFlightCell<Vec<NomenclatureVersion>>,
}

impl VersionDetailCache {
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self {
            gateway,
            cell: SingleFlightCell::new(),
        }
    }

    /// All versions with their embedded NBU lists.
    pub async fn get_all(&self) -> Result<Arc<Vec<NomenclatureVersion>>> {
        let gateway = self.gateway.clone();
        let snapshot = self
            .cell
            .get_or_fetch(async move { gateway.versions_with_nbus().await })
            .await?;
        Ok(snapshot)
    }

    /// The NBU ids currently associated with one version.
    ///
    /// # Errors
    ///
    /// `NotFound` if the remote store knows no such version.
    pub async fn membership(&self, version_id: EntityId) -> Result<BTreeSet<EntityId>> {
        let versions = self.get_all().await?;
        let version = versions
            .iter()
            .find(|v| v.id == Some(version_id))
            .ok_or(CatalogError::NotFound {
                entity: "NomenclatureVersion",
                id: version_id,
            })?;
        Ok(version.nbus.iter().map(|nbu| nbu.id).collect())
    }

    /// Drop the memoized map unconditionally.
    pub fn invalidate(&self) {
        tracing::debug!("version detail cache invalidated");
        self.cell.invalidate();
    }
}
