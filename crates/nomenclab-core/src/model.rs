//! Wire-format entity structs for the laboratory catalog.
//!
//! Every record the remote store returns carries an `entityVersion` integer
//! used for optimistic concurrency. It is modeled as `Option<i64>`: present
//! on persisted records, `None` on locally constructed ones that have not
//! been sent to the server yet. Mutating calls require it to be present.

use serde::{Deserialize, Serialize};
use time::Date;

/// Identifier assigned by the remote store to every catalog entity.
pub type EntityId = i64;

/// Root aggregate unit of the catalog.
///
/// An analysis references one NBU code, one sample type, one worksheet
/// setting and a list of determinations. The remote collection endpoint
/// returns analyses with these related entities embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_version: Option<i64>,
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbu: Option<Nbu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_type: Option<SampleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksheet_setting: Option<WorksheetSetting>,
    #[serde(default)]
    pub determinations: Vec<Determination>,
}

/// Nomenclature code (Nomenclador Bioquímico Único).
///
/// Many-to-many with [`NomenclatureVersion`] through join records carrying
/// the UB coefficient, see [`NbuVersionLink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nbu {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_version: Option<i64>,
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub abbreviations: Vec<String>,
    /// Join records to the nomenclature versions this code belongs to.
    #[serde(default)]
    pub version_links: Vec<NbuVersionLink>,
}

/// Join record of the NBU ↔ NomenclatureVersion relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NbuVersionLink {
    pub version_id: EntityId,
    /// UB (Unidad Bioquímica) coefficient attached to the association.
    pub ub: f64,
}

/// A published revision of the nomenclature.
///
/// `id` is `None` until the server has assigned one; association calls can
/// only target versions that already have a remote id. The `nbus` list is
/// populated only by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomenclatureVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_version: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<Date>,
    #[serde(default)]
    pub nbus: Vec<Nbu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Determination {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_version: Option<i64>,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleType {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_version: Option<i64>,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetSetting {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_version: Option<i64>,
    pub name: String,
    pub template: String,
}

/// Envelope returned by the paginated collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
}

/// Sort parameters accepted by the paginated collection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub sort_by: String,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            sort_by: "code".to_string(),
            ascending: true,
        }
    }
}
