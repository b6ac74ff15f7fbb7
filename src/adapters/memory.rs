use crate::core::entity::{canonical_grade, Candidate, CatalogEntity, NaturalKey};
use crate::core::range::{render_course_name, DEFAULT_COURSE_NAME_TEMPLATE};
use crate::domain::model::{
    Course, CourseDraft, EntityId, SchoolYear, SchoolYearDraft, Subject, SubjectDraft,
};
use crate::domain::ports::CatalogStore;
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StoreState {
    school_years: Vec<SchoolYear>,
    subjects: Vec<Subject>,
    courses: Vec<Course>,
    last_id: EntityId,
    create_calls: usize,
    failures: HashMap<NaturalKey, String>,
    listing_failure: Option<String>,
}

impl StoreState {
    fn next_id(&mut self) -> EntityId {
        self.last_id += 1;
        self.last_id
    }

    fn bump_ids(&mut self, seen: impl Iterator<Item = EntityId>) {
        if let Some(max) = seen.max() {
            self.last_id = self.last_id.max(max);
        }
    }

    /// Counts the call and fires a queued one-shot failure for `draft`.
    fn before_write<D: Candidate>(&mut self, draft: &D) -> Result<NaturalKey> {
        self.create_calls += 1;
        let key = draft
            .natural_key()
            .ok_or_else(|| ProvisionError::transient("draft has no natural key"))?;
        if let Some(reason) = self.failures.remove(&key) {
            return Err(ProvisionError::transient(reason));
        }
        Ok(key)
    }

    fn check_listing(&self) -> Result<()> {
        match &self.listing_failure {
            Some(reason) => Err(ProvisionError::transient(reason.clone())),
            None => Ok(()),
        }
    }
}

fn ensure_unique<E: CatalogEntity>(items: &[E], key: &NaturalKey, excluding: Option<EntityId>) -> Result<()> {
    let taken = items
        .iter()
        .any(|e| Some(e.id()) != excluding && &e.natural_key() == key);
    if taken {
        return Err(ProvisionError::conflict(E::KIND.as_str(), key.to_string()));
    }
    Ok(())
}

fn position<E: CatalogEntity>(items: &[E], id: EntityId) -> Result<usize> {
    items
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| ProvisionError::NotFoundError {
            kind: E::KIND.to_string(),
            id,
        })
}

fn course_from_draft(course_id: EntityId, school_year_id: EntityId, draft: &CourseDraft) -> Course {
    let course_name = match &draft.course_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => render_course_name(DEFAULT_COURSE_NAME_TEMPLATE, &draft.grade, &draft.section),
    };
    Course {
        course_id,
        school_year_id,
        grade: canonical_grade(&draft.grade),
        section: draft.section.trim().to_string(),
        course_name,
        teachers: draft.teachers,
    }
}

/// Process-local catalog store that enforces natural-key uniqueness the way
/// the real service does. Supports one-shot failure injection and call
/// counting for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_school_years(&self, items: Vec<SchoolYear>) {
        let mut state = self.state.lock().await;
        state.bump_ids(items.iter().map(|e| e.school_year_id));
        state.school_years.extend(items);
    }

    pub async fn seed_subjects(&self, items: Vec<Subject>) {
        let mut state = self.state.lock().await;
        state.bump_ids(items.iter().map(|e| e.subject_id));
        state.subjects.extend(items);
    }

    pub async fn seed_courses(&self, items: Vec<Course>) {
        let mut state = self.state.lock().await;
        state.bump_ids(items.iter().map(|e| e.course_id));
        state.courses.extend(items);
    }

    /// The next write for `key` fails with a transient error.
    pub async fn fail_once(&self, key: NaturalKey, reason: &str) {
        self.state.lock().await.failures.insert(key, reason.to_string());
    }

    /// Every list call fails until cleared with `None`.
    pub async fn set_listing_failure(&self, reason: Option<&str>) {
        self.state.lock().await.listing_failure = reason.map(str::to_string);
    }

    pub async fn fail_listing(&self, reason: &str) {
        self.set_listing_failure(Some(reason)).await;
    }

    /// Number of create/update calls received, successful or not.
    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_school_year(&self, draft: &SchoolYearDraft) -> Result<SchoolYear> {
        let mut state = self.state.lock().await;
        let key = state.before_write(draft)?;
        ensure_unique(&state.school_years, &key, None)?;

        let school_year = SchoolYear {
            school_year_id: state.next_id(),
            school_year_code: draft.school_year_code.trim().to_string(),
        };
        state.school_years.push(school_year.clone());
        Ok(school_year)
    }

    async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject> {
        let mut state = self.state.lock().await;
        let key = state.before_write(draft)?;
        ensure_unique(&state.subjects, &key, None)?;

        let subject = Subject {
            subject_id: state.next_id(),
            subject_name: draft.subject_name.trim().to_string(),
        };
        state.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn create_course(&self, draft: &CourseDraft) -> Result<Course> {
        let mut state = self.state.lock().await;
        let key = state.before_write(draft)?;
        ensure_unique(&state.courses, &key, None)?;

        let school_year_id = draft
            .school_year_id
            .ok_or_else(|| ProvisionError::transient("course draft has no school year"))?;
        let course_id = state.next_id();
        let course = course_from_draft(course_id, school_year_id, draft);
        state.courses.push(course.clone());
        Ok(course)
    }

    async fn update_school_year(&self, id: EntityId, draft: &SchoolYearDraft) -> Result<SchoolYear> {
        let mut state = self.state.lock().await;
        let key = state.before_write(draft)?;
        let index = position(&state.school_years, id)?;
        ensure_unique(&state.school_years, &key, Some(id))?;

        state.school_years[index].school_year_code = draft.school_year_code.trim().to_string();
        Ok(state.school_years[index].clone())
    }

    async fn update_subject(&self, id: EntityId, draft: &SubjectDraft) -> Result<Subject> {
        let mut state = self.state.lock().await;
        let key = state.before_write(draft)?;
        let index = position(&state.subjects, id)?;
        ensure_unique(&state.subjects, &key, Some(id))?;

        state.subjects[index].subject_name = draft.subject_name.trim().to_string();
        Ok(state.subjects[index].clone())
    }

    async fn update_course(&self, id: EntityId, draft: &CourseDraft) -> Result<Course> {
        let mut state = self.state.lock().await;
        let key = state.before_write(draft)?;
        let index = position(&state.courses, id)?;
        ensure_unique(&state.courses, &key, Some(id))?;

        let school_year_id = draft
            .school_year_id
            .ok_or_else(|| ProvisionError::transient("course draft has no school year"))?;
        let course = course_from_draft(id, school_year_id, draft);
        state.courses[index] = course.clone();
        Ok(course)
    }

    async fn list_school_years(&self) -> Result<Vec<SchoolYear>> {
        let state = self.state.lock().await;
        state.check_listing()?;
        Ok(state.school_years.clone())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let state = self.state.lock().await;
        state.check_listing()?;
        Ok(state.subjects.clone())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let state = self.state.lock().await;
        state.check_listing()?;
        Ok(state.courses.clone())
    }
}
