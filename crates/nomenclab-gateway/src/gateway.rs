//! The remote gateway trait.
//!
//! One method per remote endpoint, nothing else: no caching, no retries,
//! no aggregation. The catalog layer builds all of that on top of this
//! seam, and tests substitute mock implementations for it.

use async_trait::async_trait;

use nomenclab_core::{
    Analysis, Determination, EntityId, Nbu, NomenclatureVersion, Page, Result, SampleType,
    SortSpec, WorksheetSetting,
};

/// Raw access to the remote catalog store.
///
/// Mutating methods take the last-observed `entity_version` explicitly
/// where the entity itself is not part of the call; implementations must
/// reject mutations whose version is absent rather than defaulting it.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch one page of the Analysis collection.
    async fn analysis_page(
        &self,
        page: u32,
        size: u32,
        sort: &SortSpec,
        filters: &[(String, String)],
    ) -> Result<Page<Analysis>>;

    /// Point lookup of a single Analysis.
    async fn analysis_by_id(&self, id: EntityId) -> Result<Analysis>;

    /// Patch scalar fields of an Analysis. Requires `entity_version`.
    async fn patch_analysis(&self, analysis: &Analysis) -> Result<Analysis>;

    /// Replace the NBU referenced by an Analysis.
    async fn set_analysis_nbu(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        nbu_id: EntityId,
    ) -> Result<Analysis>;

    /// Replace the sample type referenced by an Analysis.
    async fn set_analysis_sample_type(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        sample_type_id: EntityId,
    ) -> Result<Analysis>;

    /// Replace the worksheet setting referenced by an Analysis.
    async fn set_analysis_worksheet_setting(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        worksheet_setting_id: EntityId,
    ) -> Result<Analysis>;

    /// Attach determinations to an Analysis.
    async fn add_determinations(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        determination_ids: &[EntityId],
    ) -> Result<Analysis>;

    /// Detach determinations from an Analysis.
    async fn remove_determinations(
        &self,
        analysis_id: EntityId,
        entity_version: i64,
        determination_ids: &[EntityId],
    ) -> Result<Analysis>;

    /// Full determination listing.
    async fn determinations(&self) -> Result<Vec<Determination>>;

    /// Full-object determination upsert.
    async fn upsert_determination(&self, determination: &Determination) -> Result<Determination>;

    /// Full-object sample type upsert.
    async fn upsert_sample_type(&self, sample_type: &SampleType) -> Result<SampleType>;

    /// Full-object worksheet setting upsert.
    async fn upsert_worksheet_setting(
        &self,
        worksheet_setting: &WorksheetSetting,
    ) -> Result<WorksheetSetting>;

    /// All nomenclature versions, without embedded NBU lists.
    async fn nomenclature_versions(&self) -> Result<Vec<NomenclatureVersion>>;

    /// Create or update a nomenclature version (full object).
    ///
    /// Creation is the only path that assigns a remote id; association
    /// calls can only target versions returned by this method or by
    /// [`CatalogGateway::nomenclature_versions`].
    async fn upsert_nomenclature_version(
        &self,
        version: &NomenclatureVersion,
    ) -> Result<NomenclatureVersion>;

    /// All nomenclature versions with their NBU membership embedded.
    async fn versions_with_nbus(&self) -> Result<Vec<NomenclatureVersion>>;

    /// Associate an NBU with a version, carrying the UB coefficient.
    async fn associate_nbu(&self, nbu_id: EntityId, version_id: EntityId, ub: f64) -> Result<()>;

    /// Remove the association between an NBU and a version.
    async fn disassociate_nbu(&self, nbu_id: EntityId, version_id: EntityId) -> Result<()>;

    /// Patch scalar fields of an NBU. Requires `entity_version`.
    async fn patch_nbu(&self, nbu: &Nbu) -> Result<Nbu>;

    /// Add synonyms to an NBU.
    async fn add_nbu_synonyms(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu>;

    /// Remove synonyms from an NBU.
    async fn remove_nbu_synonyms(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu>;

    /// Add abbreviations to an NBU.
    async fn add_nbu_abbreviations(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu>;

    /// Remove abbreviations from an NBU.
    async fn remove_nbu_abbreviations(
        &self,
        nbu_id: EntityId,
        entity_version: i64,
        values: &[String],
    ) -> Result<Nbu>;
}
