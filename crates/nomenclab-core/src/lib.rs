//! # nomenclab-core
//!
//! Shared building blocks for the nomenclab catalog client:
//!
//! - The entity model for the laboratory catalog (Analysis aggregate plus
//!   the entities it references: NBU codes, nomenclature versions,
//!   determinations, sample types, worksheet settings)
//! - The pagination envelope used by the remote collection endpoint
//! - The [`RemoteError`] taxonomy every remote call maps into
//!
//! ## Modules
//!
//! - [`model`] - Wire-format entity structs
//! - [`error`] - Error taxonomy and user-facing message mapping

pub mod error;
pub mod model;

pub use error::{RemoteError, Result};
pub use model::{
    Analysis, Determination, EntityId, Nbu, NbuVersionLink, NomenclatureVersion, Page, SampleType,
    SortSpec, WorksheetSetting,
};
