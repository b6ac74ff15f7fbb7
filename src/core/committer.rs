use crate::core::conflict::{Conflict, ConflictDetector, Screened};
use crate::core::entity::{Candidate, CatalogEntity};
use crate::core::mirror::CatalogMirror;
use crate::domain::ports::CatalogStore;

/// Result for a single candidate of a batch.
#[derive(Debug, Clone)]
pub enum CommitOutcome<E: CatalogEntity> {
    Created(E),
    /// `existing` is `None` when the store reported the conflict but the
    /// mirror does not hold the colliding entity yet.
    SkippedDuplicate {
        candidate: E::Draft,
        existing: Option<E>,
    },
    Failed {
        candidate: E::Draft,
        reason: String,
    },
}

impl<E: CatalogEntity> CommitOutcome<E> {
    pub fn label(&self) -> String {
        match self {
            CommitOutcome::Created(entity) => entity.label(),
            CommitOutcome::SkippedDuplicate { candidate, .. }
            | CommitOutcome::Failed { candidate, .. } => candidate.label(),
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CommitOutcome::Created(_))
    }
}

#[derive(Debug, Clone)]
pub enum PlannedItem<E: CatalogEntity> {
    Submit(E::Draft),
    /// Acknowledged local duplicate; recorded without touching the store.
    Skip(Conflict<E>),
}

/// Ordered list of what the committer will do with each candidate.
#[derive(Debug, Clone)]
pub struct CommitPlan<E: CatalogEntity> {
    items: Vec<PlannedItem<E>>,
}

impl<E: CatalogEntity> CommitPlan<E> {
    pub fn new(items: Vec<PlannedItem<E>>) -> Self {
        Self { items }
    }

    pub fn from_screened(screened: Vec<Screened<E>>) -> Self {
        let items = screened
            .into_iter()
            .map(|s| match s {
                Screened::Clear(draft) => PlannedItem::Submit(draft),
                Screened::Conflicting(conflict) => PlannedItem::Skip(conflict),
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[PlannedItem<E>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn submit_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, PlannedItem::Submit(_)))
            .count()
    }
}

/// Submits a plan to the store one candidate at a time.
///
/// Candidates are awaited strictly in sequence. Each success is appended to
/// the mirror before the next candidate is checked, so two candidates with the
/// same key can never both be sent.
pub struct BatchCommitter<'s> {
    store: &'s dyn CatalogStore,
}

impl<'s> BatchCommitter<'s> {
    pub fn new(store: &'s dyn CatalogStore) -> Self {
        Self { store }
    }

    pub async fn run<E: CatalogEntity>(
        &self,
        plan: CommitPlan<E>,
        mirror: &mut CatalogMirror,
    ) -> Vec<CommitOutcome<E>> {
        if plan.is_empty() {
            tracing::debug!("Empty {} plan, nothing to commit", E::KIND);
            return Vec::new();
        }

        let total = plan.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, item) in plan.items.into_iter().enumerate() {
            let outcome = match item {
                PlannedItem::Skip(conflict) => {
                    tracing::debug!(
                        "[{}/{}] Skipping {} ({})",
                        index + 1,
                        total,
                        conflict.candidate.label(),
                        conflict.key
                    );
                    CommitOutcome::SkippedDuplicate {
                        candidate: conflict.candidate,
                        existing: Some(conflict.existing),
                    }
                }
                PlannedItem::Submit(draft) => {
                    tracing::debug!("[{}/{}] Creating {} {}", index + 1, total, E::KIND, draft.label());
                    self.submit(draft, mirror).await
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn submit<E: CatalogEntity>(
        &self,
        draft: E::Draft,
        mirror: &mut CatalogMirror,
    ) -> CommitOutcome<E> {
        if let Some(existing) = ConflictDetector::check(&draft, mirror.of::<E>()) {
            tracing::warn!("{} {} already in catalog, skipped", E::KIND, draft.label());
            return CommitOutcome::SkippedDuplicate {
                existing: Some(existing.clone()),
                candidate: draft,
            };
        }

        match E::create_in(self.store, &draft).await {
            Ok(entity) => {
                mirror.append(entity.clone());
                CommitOutcome::Created(entity)
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!("Store rejected {} {} as duplicate", E::KIND, draft.label());
                let existing = draft
                    .natural_key()
                    .and_then(|key| ConflictDetector::find(&key, mirror.of::<E>(), None).cloned());
                CommitOutcome::SkippedDuplicate {
                    candidate: draft,
                    existing,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to create {} {}: {}", E::KIND, draft.label(), e);
                CommitOutcome::Failed {
                    candidate: draft,
                    reason: e.to_string(),
                }
            }
        }
    }
}
