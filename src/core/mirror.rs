//! In-memory mirror of the persisted catalog, used for local conflict checks.
//!
//! The mirror only changes in two ways: a full refresh that swaps every
//! collection at once, or an append of an entity the store just created.
//! Both mutators are crate-private so callers cannot build partial views.

use crate::core::entity::CatalogEntity;
use crate::domain::model::{Course, EntityId, SchoolYear, Subject};
use crate::domain::ports::CatalogStore;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct Collection<E> {
    items: Vec<E>,
}

impl<E> Default for Collection<E> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<E: CatalogEntity> Collection<E> {
    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub(crate) fn push(&mut self, entity: E) {
        self.items.push(entity);
    }

    /// Swaps in the stored version of an entity; unknown ids are appended.
    pub(crate) fn upsert(&mut self, entity: E) {
        let id = entity.id();
        match self.items.iter_mut().find(|e| e.id() == id) {
            Some(slot) => *slot = entity,
            None => self.items.push(entity),
        }
    }

    pub(crate) fn replace_all(&mut self, items: Vec<E>) {
        self.items = items;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogMirror {
    pub(crate) school_years: Collection<SchoolYear>,
    pub(crate) subjects: Collection<Subject>,
    pub(crate) courses: Collection<Course>,
}

impl CatalogMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mirror from an already fetched snapshot.
    pub fn from_snapshot(
        school_years: Vec<SchoolYear>,
        subjects: Vec<Subject>,
        courses: Vec<Course>,
    ) -> Self {
        let mut mirror = Self::new();
        mirror.school_years.replace_all(school_years);
        mirror.subjects.replace_all(subjects);
        mirror.courses.replace_all(courses);
        mirror
    }

    pub fn of<E: CatalogEntity>(&self) -> &[E] {
        E::collection(self).items()
    }

    pub fn school_years(&self) -> &[SchoolYear] {
        self.school_years.items()
    }

    pub fn subjects(&self) -> &[Subject] {
        self.subjects.items()
    }

    pub fn courses(&self) -> &[Course] {
        self.courses.items()
    }

    /// 從儲存端重新載入全部資料；任一清單載入失敗時保留舊資料不變
    pub async fn refresh(&mut self, store: &dyn CatalogStore) -> Result<()> {
        let school_years = store.list_school_years().await?;
        let subjects = store.list_subjects().await?;
        let courses = store.list_courses().await?;

        tracing::debug!(
            "Mirror refreshed: {} school years, {} subjects, {} courses",
            school_years.len(),
            subjects.len(),
            courses.len()
        );

        self.school_years.replace_all(school_years);
        self.subjects.replace_all(subjects);
        self.courses.replace_all(courses);
        Ok(())
    }

    pub(crate) fn append<E: CatalogEntity>(&mut self, entity: E) {
        E::collection_mut(self).push(entity);
    }

    pub(crate) fn upsert<E: CatalogEntity>(&mut self, entity: E) {
        E::collection_mut(self).upsert(entity);
    }
}
