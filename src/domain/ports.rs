use crate::domain::model::{
    Course, CourseDraft, EntityId, SchoolYear, SchoolYearDraft, Subject, SubjectDraft,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Persistence collaborator for the academic catalog.
///
/// `create_*` must report a natural-key collision as
/// [`ProvisionError::ConflictError`](crate::utils::error::ProvisionError::ConflictError)
/// so the committer can tell "already exists" apart from every other failure.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_school_year(&self, draft: &SchoolYearDraft) -> Result<SchoolYear>;
    async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject>;
    async fn create_course(&self, draft: &CourseDraft) -> Result<Course>;

    async fn update_school_year(&self, id: EntityId, draft: &SchoolYearDraft) -> Result<SchoolYear>;
    async fn update_subject(&self, id: EntityId, draft: &SubjectDraft) -> Result<Subject>;
    async fn update_course(&self, id: EntityId, draft: &CourseDraft) -> Result<Course>;

    async fn list_school_years(&self) -> Result<Vec<SchoolYear>>;
    async fn list_subjects(&self) -> Result<Vec<Subject>>;
    async fn list_courses(&self) -> Result<Vec<Course>>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout_seconds(&self) -> u64;
    fn auth_token(&self) -> Option<&str>;
    fn course_name_template(&self) -> &str;
}
