use crate::core::aggregator::BatchSummary;
use crate::core::conflict::ConflictDetector;
use crate::core::entity::{Candidate, CatalogEntity};
use crate::core::mirror::CatalogMirror;
use crate::core::range::RangeExpander;
use crate::core::workflow::{ConfirmationWorkflow, Phase};
use crate::domain::model::{BatchRequest, Course, EntityId};
use crate::domain::ports::CatalogStore;
use crate::utils::error::{ProvisionError, Result};

/// 學年、科目、課程建立的進入點
///
/// Owns the store and the mirror. Plain creates go straight through
/// validate -> detect -> persist; batches go through a
/// [`ConfirmationWorkflow`] the caller drives.
pub struct ProvisioningEngine<S: CatalogStore> {
    store: S,
    mirror: CatalogMirror,
    expander: RangeExpander,
}

impl<S: CatalogStore> ProvisioningEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_expander(store, RangeExpander::default())
    }

    pub fn with_expander(store: S, expander: RangeExpander) -> Self {
        Self {
            store,
            mirror: CatalogMirror::new(),
            expander,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mirror(&self) -> &CatalogMirror {
        &self.mirror
    }

    pub fn expander(&self) -> &RangeExpander {
        &self.expander
    }

    /// Replaces the mirror with a fresh snapshot from the store.
    pub async fn refresh(&mut self) -> Result<()> {
        self.mirror.refresh(&self.store).await
    }

    fn prepare<E: CatalogEntity>(&self, draft: E::Draft) -> E::Draft {
        draft.with_defaults(self.expander.template())
    }

    /// Creates a single entity. A local conflict is reported without any
    /// call to the store.
    pub async fn create<E: CatalogEntity>(&mut self, draft: E::Draft) -> Result<E> {
        draft.validate().into_result()?;
        let draft = self.prepare::<E>(draft);

        if let Some(existing) = ConflictDetector::check(&draft, self.mirror.of::<E>()) {
            tracing::info!(
                "{} {} already exists as #{}",
                E::KIND,
                draft.label(),
                existing.id()
            );
            return Err(ProvisionError::conflict(E::KIND.as_str(), existing.label()));
        }

        let entity = E::create_in(&self.store, &draft).await?;
        tracing::info!("Created {} {} (#{})", E::KIND, entity.label(), entity.id());
        self.mirror.append(entity.clone());
        Ok(entity)
    }

    /// Edits an existing entity. Keeping the same natural key is not a conflict.
    ///
    /// Once the store accepts the change the result is `Ok` and the mirror
    /// holds the new version, even if the follow-up refresh fails.
    pub async fn update<E: CatalogEntity>(&mut self, id: EntityId, draft: E::Draft) -> Result<E> {
        draft.validate().into_result()?;
        let draft = self.prepare::<E>(draft);

        if let Some(existing) = ConflictDetector::check_edit(id, &draft, self.mirror.of::<E>()) {
            return Err(ProvisionError::conflict(E::KIND.as_str(), existing.label()));
        }

        let entity = E::update_in(&self.store, id, &draft).await?;
        tracing::info!("Updated {} #{}", E::KIND, id);
        self.mirror.upsert(entity.clone());

        // 更新已寫入；重新載入失敗只影響其他項目的新鮮度
        if let Err(e) = self.refresh().await {
            tracing::warn!("Mirror refresh after updating {} #{} failed: {}", E::KIND, id, e);
        }
        Ok(entity)
    }

    /// Screens user-entered candidates; the workflow then waits for the caller.
    pub fn stage<E: CatalogEntity>(
        &self,
        workflow: &mut ConfirmationWorkflow<E>,
        candidates: Vec<E::Draft>,
    ) -> Result<Phase> {
        let candidates = candidates
            .into_iter()
            .map(|d| self.prepare::<E>(d))
            .collect();
        workflow.submit(candidates, self.mirror.of::<E>())
    }

    pub fn stage_grades(
        &self,
        workflow: &mut ConfirmationWorkflow<Course>,
        request: &BatchRequest,
    ) -> Result<Phase> {
        tracing::info!(
            "Staging grades {}..={} section '{}'",
            request.start_grade,
            request.end_grade,
            request.section.trim()
        );
        workflow.submit_range(&self.expander, request, self.mirror.courses())
    }

    /// Runs a confirmed workflow. See [`ConfirmationWorkflow::commit`].
    pub async fn commit<'w, E: CatalogEntity>(
        &mut self,
        workflow: &'w mut ConfirmationWorkflow<E>,
    ) -> Result<&'w BatchSummary<E>> {
        workflow.commit(&self.store, &mut self.mirror).await
    }
}
