//! Uniform view over the three catalog entity kinds.
//!
//! The committer, detector and workflow are written once against
//! [`CatalogEntity`]; each kind plugs in its natural key, its mirror slot and
//! the matching persistence calls.

use crate::core::mirror::{CatalogMirror, Collection};
use crate::core::range::render_course_name;
use crate::core::validator::{self, FieldErrors};
use crate::domain::model::{
    Course, CourseDraft, EntityId, EntityKind, SchoolYear, SchoolYearDraft, Subject, SubjectDraft,
};
use crate::domain::ports::CatalogStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// "03", "+3" and " 3" all name grade 3. Text that is not a number is
/// only trimmed; the validator rejects it.
pub fn canonical_grade(grade: &str) -> String {
    let grade = grade.trim();
    match grade.parse::<u8>() {
        Ok(g) => g.to_string(),
        Err(_) => grade.to_string(),
    }
}

/// Natural key after trimming and case folding. Two entities with equal keys
/// are the same catalog entry regardless of their assigned ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    SchoolYear(String),
    Subject(String),
    Course {
        school_year_id: EntityId,
        grade: String,
        section: String,
    },
}

impl NaturalKey {
    pub fn school_year(code: &str) -> Self {
        NaturalKey::SchoolYear(normalize(code))
    }

    pub fn subject(name: &str) -> Self {
        NaturalKey::Subject(normalize(name))
    }

    pub fn course(school_year_id: EntityId, grade: &str, section: &str) -> Self {
        NaturalKey::Course {
            school_year_id,
            grade: canonical_grade(grade).to_lowercase(),
            section: normalize(section),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::SchoolYear(code) => write!(f, "school year '{}'", code),
            NaturalKey::Subject(name) => write!(f, "subject '{}'", name),
            NaturalKey::Course {
                school_year_id,
                grade,
                section,
            } => write!(
                f,
                "course grade {} section '{}' in school year #{}",
                grade, section, school_year_id
            ),
        }
    }
}

/// An unsaved draft that can be validated and keyed.
pub trait Candidate: Clone + fmt::Debug + Send + Sync + 'static {
    /// `None` when the draft lacks the fields its key is made of.
    fn natural_key(&self) -> Option<NaturalKey>;
    fn label(&self) -> String;
    fn validate(&self) -> FieldErrors;

    /// Fills fields the user may leave out.
    fn with_defaults(self, _course_name_template: &str) -> Self {
        self
    }
}

#[async_trait]
pub trait CatalogEntity: Clone + fmt::Debug + Send + Sync + 'static {
    type Draft: Candidate;
    const KIND: EntityKind;

    fn id(&self) -> EntityId;
    fn natural_key(&self) -> NaturalKey;
    fn label(&self) -> String;

    fn collection(mirror: &CatalogMirror) -> &Collection<Self>;
    fn collection_mut(mirror: &mut CatalogMirror) -> &mut Collection<Self>;

    async fn create_in(store: &dyn CatalogStore, draft: &Self::Draft) -> Result<Self>;
    async fn update_in(store: &dyn CatalogStore, id: EntityId, draft: &Self::Draft) -> Result<Self>;
    async fn list_in(store: &dyn CatalogStore) -> Result<Vec<Self>>;
}

impl Candidate for SchoolYearDraft {
    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::school_year(&self.school_year_code))
    }

    fn label(&self) -> String {
        self.school_year_code.trim().to_string()
    }

    fn validate(&self) -> FieldErrors {
        validator::validate_school_year(self)
    }
}

impl Candidate for SubjectDraft {
    fn natural_key(&self) -> Option<NaturalKey> {
        Some(NaturalKey::subject(&self.subject_name))
    }

    fn label(&self) -> String {
        self.subject_name.trim().to_string()
    }

    fn validate(&self) -> FieldErrors {
        validator::validate_subject(self)
    }
}

impl Candidate for CourseDraft {
    fn natural_key(&self) -> Option<NaturalKey> {
        self.school_year_id
            .map(|year| NaturalKey::course(year, &self.grade, &self.section))
    }

    fn label(&self) -> String {
        match &self.course_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("grade {} section {}", self.grade.trim(), self.section.trim()),
        }
    }

    fn validate(&self) -> FieldErrors {
        validator::validate_course(self)
    }

    fn with_defaults(mut self, course_name_template: &str) -> Self {
        self.grade = canonical_grade(&self.grade);
        let unnamed = self
            .course_name
            .as_deref()
            .map_or(true, |name| name.trim().is_empty());
        if unnamed {
            self.course_name = Some(render_course_name(
                course_name_template,
                &self.grade,
                &self.section,
            ));
        }
        self
    }
}

#[async_trait]
impl CatalogEntity for SchoolYear {
    type Draft = SchoolYearDraft;
    const KIND: EntityKind = EntityKind::SchoolYear;

    fn id(&self) -> EntityId {
        self.school_year_id
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::school_year(&self.school_year_code)
    }

    fn label(&self) -> String {
        self.school_year_code.clone()
    }

    fn collection(mirror: &CatalogMirror) -> &Collection<Self> {
        &mirror.school_years
    }

    fn collection_mut(mirror: &mut CatalogMirror) -> &mut Collection<Self> {
        &mut mirror.school_years
    }

    async fn create_in(store: &dyn CatalogStore, draft: &SchoolYearDraft) -> Result<Self> {
        store.create_school_year(draft).await
    }

    async fn update_in(store: &dyn CatalogStore, id: EntityId, draft: &SchoolYearDraft) -> Result<Self> {
        store.update_school_year(id, draft).await
    }

    async fn list_in(store: &dyn CatalogStore) -> Result<Vec<Self>> {
        store.list_school_years().await
    }
}

#[async_trait]
impl CatalogEntity for Subject {
    type Draft = SubjectDraft;
    const KIND: EntityKind = EntityKind::Subject;

    fn id(&self) -> EntityId {
        self.subject_id
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::subject(&self.subject_name)
    }

    fn label(&self) -> String {
        self.subject_name.clone()
    }

    fn collection(mirror: &CatalogMirror) -> &Collection<Self> {
        &mirror.subjects
    }

    fn collection_mut(mirror: &mut CatalogMirror) -> &mut Collection<Self> {
        &mut mirror.subjects
    }

    async fn create_in(store: &dyn CatalogStore, draft: &SubjectDraft) -> Result<Self> {
        store.create_subject(draft).await
    }

    async fn update_in(store: &dyn CatalogStore, id: EntityId, draft: &SubjectDraft) -> Result<Self> {
        store.update_subject(id, draft).await
    }

    async fn list_in(store: &dyn CatalogStore) -> Result<Vec<Self>> {
        store.list_subjects().await
    }
}

#[async_trait]
impl CatalogEntity for Course {
    type Draft = CourseDraft;
    const KIND: EntityKind = EntityKind::Course;

    fn id(&self) -> EntityId {
        self.course_id
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::course(self.school_year_id, &self.grade, &self.section)
    }

    fn label(&self) -> String {
        self.course_name.clone()
    }

    fn collection(mirror: &CatalogMirror) -> &Collection<Self> {
        &mirror.courses
    }

    fn collection_mut(mirror: &mut CatalogMirror) -> &mut Collection<Self> {
        &mut mirror.courses
    }

    async fn create_in(store: &dyn CatalogStore, draft: &CourseDraft) -> Result<Self> {
        store.create_course(draft).await
    }

    async fn update_in(store: &dyn CatalogStore, id: EntityId, draft: &CourseDraft) -> Result<Self> {
        store.update_course(id, draft).await
    }

    async fn list_in(store: &dyn CatalogStore) -> Result<Vec<Self>> {
        store.list_courses().await
    }
}
