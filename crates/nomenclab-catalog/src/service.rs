//! The catalog service facade.
//!
//! Owns the root cache, the version detail cache and the session-local
//! overlay maps, and is the only component that mutates the remote
//! NBU ↔ version join. Every mutation that goes through here invalidates
//! the root cache; association changes and version upserts additionally
//! invalidate the version detail cache, so the two client-side
//! representations of the membership are never retired separately.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use nomenclab_core::{
    Analysis, Determination, EntityId, Nbu, NomenclatureVersion, RemoteError, SampleType,
    WorksheetSetting,
};
use nomenclab_gateway::CatalogGateway;

use crate::error::{CatalogError, Result};
use crate::fanout::settle_all;
use crate::reconcile::{ReconcileOutcome, membership_diff};
use crate::root_cache::{AnalysisSnapshot, RootCache};
use crate::version_cache::VersionDetailCache;

/// Data-access facade for the laboratory catalog.
pub struct CatalogService {
    gateway: Arc<dyn CatalogGateway>,
    root: RootCache,
    versions: VersionDetailCache,
    local_sample_types: Mutex<IndexMap<EntityId, SampleType>>,
    local_worksheet_settings: Mutex<IndexMap<EntityId, WorksheetSetting>>,
}

impl CatalogService {
    pub fn new(gateway: Arc<dyn CatalogGateway>, page_size: u32) -> Self {
        Self {
            root: RootCache::new(gateway.clone(), page_size),
            versions: VersionDetailCache::new(gateway.clone()),
            gateway,
            local_sample_types: Mutex::new(IndexMap::new()),
            local_worksheet_settings: Mutex::new(IndexMap::new()),
        }
    }

    // -------------------------------------------------------------------
    // Root aggregate access
    // -------------------------------------------------------------------

    /// The full deduplicated Analysis collection (memoized, single-flight).
    pub async fn analyses(&self) -> Result<AnalysisSnapshot> {
        self.root.get_all().await
    }

    /// Point lookup of one Analysis, always from the server.
    pub async fn analysis(&self, id: EntityId) -> Result<Analysis> {
        self.root.get_by_id(id).await
    }

    /// Drop the memoized Analysis collection.
    pub fn invalidate(&self) {
        self.root.invalidate();
    }

    /// Invalidate and refetch the Analysis collection.
    pub async fn refresh(&self) -> Result<AnalysisSnapshot> {
        self.root.refresh().await
    }

    // -------------------------------------------------------------------
    // Derived extraction
    // -------------------------------------------------------------------

    /// Every determination referenced by the catalog, deduplicated by id,
    /// first occurrence first.
    pub async fn determinations(&self) -> Result<Vec<Determination>> {
        let map = self
            .extract_map(|analysis, map| {
                for det in &analysis.determinations {
                    map.entry(det.id).or_insert_with(|| det.clone());
                }
            })
            .await?;
        Ok(map.into_values().collect())
    }

    pub async fn determination(&self, id: EntityId) -> Result<Determination> {
        self.determinations()
            .await?
            .into_iter()
            .find(|det| det.id == id)
            .ok_or(CatalogError::NotFound {
                entity: "Determination",
                id,
            })
    }

    /// Every NBU referenced by the catalog.
    pub async fn nbus(&self) -> Result<Vec<Nbu>> {
        let map = self
            .extract_map(|analysis, map| {
                if let Some(nbu) = &analysis.nbu {
                    map.entry(nbu.id).or_insert_with(|| nbu.clone());
                }
            })
            .await?;
        Ok(map.into_values().collect())
    }

    pub async fn nbu(&self, id: EntityId) -> Result<Nbu> {
        self.nbus()
            .await?
            .into_iter()
            .find(|nbu| nbu.id == id)
            .ok_or(CatalogError::NotFound { entity: "Nbu", id })
    }

    /// Every sample type referenced by the catalog, merged with the
    /// session-local map. Local entries win over extracted ones sharing an
    /// id, and entries created this session appear even when no Analysis
    /// references them yet.
    pub async fn sample_types(&self) -> Result<Vec<SampleType>> {
        let mut map = self
            .extract_map(|analysis, map| {
                if let Some(st) = &analysis.sample_type {
                    map.entry(st.id).or_insert_with(|| st.clone());
                }
            })
            .await?;
        {
            let local = self.local_sample_types.lock().expect("overlay lock poisoned");
            for (id, st) in local.iter() {
                map.insert(*id, st.clone());
            }
        }
        Ok(map.into_values().collect())
    }

    pub async fn sample_type(&self, id: EntityId) -> Result<SampleType> {
        self.sample_types()
            .await?
            .into_iter()
            .find(|st| st.id == id)
            .ok_or(CatalogError::NotFound {
                entity: "SampleType",
                id,
            })
    }

    /// Every worksheet setting referenced by the catalog, merged with the
    /// session-local map (same precedence as sample types).
    pub async fn worksheet_settings(&self) -> Result<Vec<WorksheetSetting>> {
        let mut map = self
            .extract_map(|analysis, map| {
                if let Some(ws) = &analysis.worksheet_setting {
                    map.entry(ws.id).or_insert_with(|| ws.clone());
                }
            })
            .await?;
        {
            let local = self
                .local_worksheet_settings
                .lock()
                .expect("overlay lock poisoned");
            for (id, ws) in local.iter() {
                map.insert(*id, ws.clone());
            }
        }
        Ok(map.into_values().collect())
    }

    pub async fn worksheet_setting(&self, id: EntityId) -> Result<WorksheetSetting> {
        self.worksheet_settings()
            .await?
            .into_iter()
            .find(|ws| ws.id == id)
            .ok_or(CatalogError::NotFound {
                entity: "WorksheetSetting",
                id,
            })
    }

    async fn extract_map<T>(
        &self,
        collect: impl Fn(&Analysis, &mut IndexMap<EntityId, T>),
    ) -> Result<IndexMap<EntityId, T>> {
        let snapshot = self.root.get_all().await?;
        let mut map = IndexMap::new();
        for analysis in snapshot.iter() {
            collect(analysis, &mut map);
        }
        Ok(map)
    }

    // -------------------------------------------------------------------
    // Versions
    // -------------------------------------------------------------------

    /// All nomenclature versions, without membership (never cached).
    pub async fn nomenclature_versions(&self) -> Result<Vec<NomenclatureVersion>> {
        Ok(self.gateway.nomenclature_versions().await?)
    }

    /// All versions with embedded NBU lists (memoized).
    pub async fn versions_with_nbus(&self) -> Result<Arc<Vec<NomenclatureVersion>>> {
        self.versions.get_all().await
    }

    /// The NBU ids currently associated with a version (memoized).
    pub async fn version_membership(&self, version_id: EntityId) -> Result<BTreeSet<EntityId>> {
        self.versions.membership(version_id).await
    }

    // -------------------------------------------------------------------
    // Membership reconciliation
    // -------------------------------------------------------------------

    /// Bring a version's NBU membership to `desired`, issuing the minimal
    /// pairwise associate/disassociate calls.
    ///
    /// When `desired == current` no remote call is made. Otherwise every
    /// call runs concurrently and individual failures never cancel the
    /// others; regardless of failures, both caches are invalidated and the
    /// authoritative membership is reloaded before the outcome (with its
    /// warning buckets) is returned.
    ///
    /// # Errors
    ///
    /// Only the post-run resync can fail this method; fan-out failures are
    /// reported as warnings in the [`ReconcileOutcome`].
    pub async fn reconcile(
        &self,
        version_id: EntityId,
        desired: &BTreeSet<EntityId>,
        current: &BTreeSet<EntityId>,
        ub: f64,
    ) -> Result<ReconcileOutcome> {
        let (to_add, to_remove) = membership_diff(desired, current);
        if to_add.is_empty() && to_remove.is_empty() {
            tracing::debug!(version = version_id, "membership already reconciled");
            return Ok(ReconcileOutcome::unchanged(desired.clone()));
        }

        enum PairOp {
            Add(EntityId),
            Remove(EntityId),
        }

        let mut ops = Vec::with_capacity(to_add.len() + to_remove.len());
        for &id in &to_add {
            ops.push((PairOp::Add(id), self.gateway.associate_nbu(id, version_id, ub)));
        }
        for &id in &to_remove {
            ops.push((PairOp::Remove(id), self.gateway.disassociate_nbu(id, version_id)));
        }
        let calls_issued = ops.len();
        let settled = settle_all(ops).await;

        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut association_errors: Vec<(EntityId, RemoteError)> = Vec::new();
        let mut disassociation_errors: Vec<(EntityId, RemoteError)> = Vec::new();
        for (op, result) in settled {
            match (op, result) {
                (PairOp::Add(id), Ok(())) => added.push(id),
                (PairOp::Add(id), Err(err)) => association_errors.push((id, err)),
                (PairOp::Remove(id), Ok(())) => removed.push(id),
                (PairOp::Remove(id), Err(err)) => disassociation_errors.push((id, err)),
            }
        }

        // Pessimistic resync: partial failure means the locally assumed
        // membership may be wrong for some ids, so reload server truth.
        self.root.invalidate();
        self.versions.invalidate();
        let membership = self.versions.membership(version_id).await?;

        if !association_errors.is_empty() || !disassociation_errors.is_empty() {
            tracing::warn!(
                version = version_id,
                failed_adds = association_errors.len(),
                failed_removes = disassociation_errors.len(),
                "membership reconciliation finished with warnings"
            );
        } else {
            tracing::debug!(
                version = version_id,
                added = added.len(),
                removed = removed.len(),
                "membership reconciled"
            );
        }

        Ok(ReconcileOutcome {
            added,
            removed,
            association_errors,
            disassociation_errors,
            membership,
            calls_issued,
        })
    }

    /// Create or update a version, then reconcile its membership.
    ///
    /// A version without a remote id is created first (awaited) so the
    /// reconcile has an id to target. Creation and reconciliation are not
    /// transactional: if reconciliation fails afterwards, the created
    /// version remains, partially associated, for retry.
    pub async fn save_version(
        &self,
        version: &NomenclatureVersion,
        desired: &BTreeSet<EntityId>,
        ub: f64,
    ) -> Result<(NomenclatureVersion, ReconcileOutcome)> {
        let creating = version.id.is_none();
        let saved = self.gateway.upsert_nomenclature_version(version).await?;
        self.versions.invalidate();
        let version_id = saved.id.ok_or_else(|| {
            CatalogError::from(RemoteError::decode(
                "server returned a nomenclature version without an id",
            ))
        })?;

        let current = if creating {
            BTreeSet::new()
        } else {
            self.versions.membership(version_id).await?
        };
        let outcome = self.reconcile(version_id, desired, &current, ub).await?;
        Ok((saved, outcome))
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Patch scalar fields of an Analysis.
    pub async fn update_analysis(&self, analysis: &Analysis) -> Result<Analysis> {
        let updated = self.gateway.patch_analysis(analysis).await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Replace the NBU referenced by an Analysis.
    pub async fn set_analysis_nbu(&self, analysis: &Analysis, nbu_id: EntityId) -> Result<Analysis> {
        let version = require_version("Analysis", analysis.entity_version)?;
        let updated = self
            .gateway
            .set_analysis_nbu(analysis.id, version, nbu_id)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Replace the sample type referenced by an Analysis.
    pub async fn set_analysis_sample_type(
        &self,
        analysis: &Analysis,
        sample_type_id: EntityId,
    ) -> Result<Analysis> {
        let version = require_version("Analysis", analysis.entity_version)?;
        let updated = self
            .gateway
            .set_analysis_sample_type(analysis.id, version, sample_type_id)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Replace the worksheet setting referenced by an Analysis.
    pub async fn set_analysis_worksheet_setting(
        &self,
        analysis: &Analysis,
        worksheet_setting_id: EntityId,
    ) -> Result<Analysis> {
        let version = require_version("Analysis", analysis.entity_version)?;
        let updated = self
            .gateway
            .set_analysis_worksheet_setting(analysis.id, version, worksheet_setting_id)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Attach determinations to an Analysis.
    pub async fn add_determinations(
        &self,
        analysis: &Analysis,
        determination_ids: &[EntityId],
    ) -> Result<Analysis> {
        let version = require_version("Analysis", analysis.entity_version)?;
        let updated = self
            .gateway
            .add_determinations(analysis.id, version, determination_ids)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Detach determinations from an Analysis.
    pub async fn remove_determinations(
        &self,
        analysis: &Analysis,
        determination_ids: &[EntityId],
    ) -> Result<Analysis> {
        let version = require_version("Analysis", analysis.entity_version)?;
        let updated = self
            .gateway
            .remove_determinations(analysis.id, version, determination_ids)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Full-object determination upsert.
    pub async fn save_determination(&self, determination: &Determination) -> Result<Determination> {
        let saved = self.gateway.upsert_determination(determination).await?;
        self.root.invalidate();
        Ok(saved)
    }

    /// Full-object sample type upsert; the result joins the session-local
    /// map so it is listed before any Analysis references it.
    pub async fn save_sample_type(&self, sample_type: &SampleType) -> Result<SampleType> {
        let saved = self.gateway.upsert_sample_type(sample_type).await?;
        self.record_local_sample_type(saved.clone());
        self.root.invalidate();
        Ok(saved)
    }

    /// Full-object worksheet setting upsert; the result joins the
    /// session-local map.
    pub async fn save_worksheet_setting(
        &self,
        worksheet_setting: &WorksheetSetting,
    ) -> Result<WorksheetSetting> {
        let saved = self.gateway.upsert_worksheet_setting(worksheet_setting).await?;
        self.record_local_worksheet_setting(saved.clone());
        self.root.invalidate();
        Ok(saved)
    }

    /// Patch scalar fields of an NBU.
    pub async fn update_nbu(&self, nbu: &Nbu) -> Result<Nbu> {
        let updated = self.gateway.patch_nbu(nbu).await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Add synonyms to an NBU.
    pub async fn add_nbu_synonyms(&self, nbu: &Nbu, values: &[String]) -> Result<Nbu> {
        let version = require_version("Nbu", nbu.entity_version)?;
        let updated = self.gateway.add_nbu_synonyms(nbu.id, version, values).await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Remove synonyms from an NBU.
    pub async fn remove_nbu_synonyms(&self, nbu: &Nbu, values: &[String]) -> Result<Nbu> {
        let version = require_version("Nbu", nbu.entity_version)?;
        let updated = self
            .gateway
            .remove_nbu_synonyms(nbu.id, version, values)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Add abbreviations to an NBU.
    pub async fn add_nbu_abbreviations(&self, nbu: &Nbu, values: &[String]) -> Result<Nbu> {
        let version = require_version("Nbu", nbu.entity_version)?;
        let updated = self
            .gateway
            .add_nbu_abbreviations(nbu.id, version, values)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Remove abbreviations from an NBU.
    pub async fn remove_nbu_abbreviations(&self, nbu: &Nbu, values: &[String]) -> Result<Nbu> {
        let version = require_version("Nbu", nbu.entity_version)?;
        let updated = self
            .gateway
            .remove_nbu_abbreviations(nbu.id, version, values)
            .await?;
        self.root.invalidate();
        Ok(updated)
    }

    /// Record a sample type created or edited this session.
    pub fn record_local_sample_type(&self, sample_type: SampleType) {
        let mut local = self.local_sample_types.lock().expect("overlay lock poisoned");
        local.insert(sample_type.id, sample_type);
    }

    /// Record a worksheet setting created or edited this session.
    pub fn record_local_worksheet_setting(&self, worksheet_setting: WorksheetSetting) {
        let mut local = self
            .local_worksheet_settings
            .lock()
            .expect("overlay lock poisoned");
        local.insert(worksheet_setting.id, worksheet_setting);
    }
}

fn require_version(entity: &'static str, entity_version: Option<i64>) -> Result<i64> {
    entity_version.ok_or_else(|| RemoteError::MissingEntityVersion { entity }.into())
}
