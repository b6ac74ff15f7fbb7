pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::ProvisionConfig;

pub use adapters::{HttpCatalogStore, InMemoryCatalogStore};
pub use core::{
    aggregator::BatchSummary,
    committer::CommitOutcome,
    engine::ProvisioningEngine,
    entity::{CatalogEntity, NaturalKey},
    mirror::CatalogMirror,
    range::RangeExpander,
    workflow::{ConfirmationWorkflow, Phase},
};
pub use domain::model::{
    BatchRequest, Course, CourseDraft, SchoolYear, SchoolYearDraft, Subject, SubjectDraft,
    TeacherSlots,
};
pub use utils::error::{ProvisionError, Result};
