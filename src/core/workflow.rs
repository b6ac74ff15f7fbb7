//! Confirmation state machine wrapped around a batch.
//!
//! ```text
//! Idle -> Validating -> NoConflicts ----------> AwaitingConfirmation -> Committing -> Done
//!                    \-> ConflictsFound --ack--^                                   \-> Failed
//! (any state before Committing) --cancel--> Cancelled
//! ```
//!
//! A front end renders [`ConfirmationWorkflow::phase`] and calls the event
//! methods; every illegal event is answered with `WorkflowError` and leaves
//! the state untouched.

use crate::core::aggregator::{BatchSummary, ResultAggregator};
use crate::core::committer::{BatchCommitter, CommitPlan, PlannedItem};
use crate::core::conflict::{Conflict, ConflictDetector};
use crate::core::entity::{Candidate, CatalogEntity, NaturalKey};
use crate::core::mirror::CatalogMirror;
use crate::core::range::RangeExpander;
use crate::core::validator::FieldErrors;
use crate::domain::model::{BatchRequest, Course};
use crate::domain::ports::CatalogStore;
use crate::utils::error::{ProvisionError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    NoConflicts,
    ConflictsFound,
    AwaitingConfirmation,
    Committing,
    Done,
    Cancelled,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::NoConflicts => "free of conflicts",
            Phase::ConflictsFound => "holding conflicts",
            Phase::AwaitingConfirmation => "awaiting confirmation",
            Phase::Committing => "committing",
            Phase::Done => "done",
            Phase::Cancelled => "cancelled",
            Phase::Failed => "failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
pub enum WorkflowState<E: CatalogEntity> {
    Idle,
    Validating,
    NoConflicts { plan: CommitPlan<E> },
    /// `plan` keeps input order: conflicting candidates as `Skip`, the
    /// remainder as `Submit`.
    ConflictsFound { plan: CommitPlan<E> },
    AwaitingConfirmation { plan: CommitPlan<E> },
    Committing,
    Done { summary: BatchSummary<E> },
    Cancelled,
    /// The batch ran to completion but the mirror could not be refreshed.
    Failed {
        summary: BatchSummary<E>,
        reason: String,
    },
}

impl<E: CatalogEntity> WorkflowState<E> {
    pub fn phase(&self) -> Phase {
        match self {
            WorkflowState::Idle => Phase::Idle,
            WorkflowState::Validating => Phase::Validating,
            WorkflowState::NoConflicts { .. } => Phase::NoConflicts,
            WorkflowState::ConflictsFound { .. } => Phase::ConflictsFound,
            WorkflowState::AwaitingConfirmation { .. } => Phase::AwaitingConfirmation,
            WorkflowState::Committing => Phase::Committing,
            WorkflowState::Done { .. } => Phase::Done,
            WorkflowState::Cancelled => Phase::Cancelled,
            WorkflowState::Failed { .. } => Phase::Failed,
        }
    }
}

#[derive(Debug)]
pub struct ConfirmationWorkflow<E: CatalogEntity> {
    state: WorkflowState<E>,
}

impl<E: CatalogEntity> Default for ConfirmationWorkflow<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CatalogEntity> ConfirmationWorkflow<E> {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn state(&self) -> &WorkflowState<E> {
        &self.state
    }

    fn transition(&mut self, next: WorkflowState<E>) {
        let from = self.phase();
        self.enter(from, next);
    }

    fn enter(&mut self, from: Phase, next: WorkflowState<E>) {
        tracing::debug!("{} workflow: {} -> {}", E::KIND, from, next.phase());
        self.state = next;
    }

    fn refuse(&self, action: &str) -> ProvisionError {
        ProvisionError::WorkflowError {
            action: action.to_string(),
            phase: self.phase().to_string(),
        }
    }

    fn begin(&mut self) -> Result<()> {
        match self.state {
            WorkflowState::Idle | WorkflowState::Cancelled => {
                self.transition(WorkflowState::Validating);
                Ok(())
            }
            _ => Err(self.refuse("accept a new request")),
        }
    }

    /// Validates and screens candidates against `existing`.
    ///
    /// Ends in `AwaitingConfirmation` (no conflicts) or `ConflictsFound`.
    /// Invalid input aborts the request and returns to `Idle`.
    pub fn submit(&mut self, candidates: Vec<E::Draft>, existing: &[E]) -> Result<Phase> {
        self.begin()?;
        self.screen(candidates, existing)
    }

    fn screen(&mut self, candidates: Vec<E::Draft>, existing: &[E]) -> Result<Phase> {
        if let Err(e) = validate_all(&candidates) {
            self.transition(WorkflowState::Idle);
            return Err(e);
        }

        let plan = CommitPlan::from_screened(ConflictDetector::screen(candidates, existing));
        let conflicting = plan.len() - plan.submit_count();

        if conflicting == 0 {
            self.transition(WorkflowState::NoConflicts { plan });
            if let WorkflowState::NoConflicts { plan } =
                std::mem::replace(&mut self.state, WorkflowState::Validating)
            {
                self.enter(Phase::NoConflicts, WorkflowState::AwaitingConfirmation { plan });
            }
        } else {
            tracing::info!(
                "{} of {} {} candidates already exist",
                conflicting,
                plan.len(),
                E::KIND
            );
            self.transition(WorkflowState::ConflictsFound { plan });
        }

        Ok(self.phase())
    }

    /// Conflicts surfaced by the last submission (empty outside `ConflictsFound`).
    pub fn conflicts(&self) -> Vec<&Conflict<E>> {
        match &self.state {
            WorkflowState::ConflictsFound { plan } => plan
                .items()
                .iter()
                .filter_map(|item| match item {
                    PlannedItem::Skip(conflict) => Some(conflict),
                    PlannedItem::Submit(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn conflicting_keys(&self) -> Vec<NaturalKey> {
        self.conflicts().into_iter().map(|c| c.key.clone()).collect()
    }

    /// Candidates that would still be sent to the store.
    pub fn remainder(&self) -> Vec<&E::Draft> {
        match &self.state {
            WorkflowState::ConflictsFound { plan }
            | WorkflowState::AwaitingConfirmation { plan }
            | WorkflowState::NoConflicts { plan } => plan
                .items()
                .iter()
                .filter_map(|item| match item {
                    PlannedItem::Submit(draft) => Some(draft),
                    PlannedItem::Skip(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Accepts skipping the conflicting candidates. Refused when nothing
    /// would remain to commit.
    pub fn acknowledge_conflicts(&mut self) -> Result<Phase> {
        match std::mem::replace(&mut self.state, WorkflowState::Validating) {
            WorkflowState::ConflictsFound { plan } if plan.submit_count() > 0 => {
                self.enter(Phase::ConflictsFound, WorkflowState::AwaitingConfirmation { plan });
                Ok(self.phase())
            }
            other => {
                self.state = other;
                Err(self.refuse("proceed with conflicting candidates"))
            }
        }
    }

    pub fn cancel(&mut self) -> Result<Phase> {
        match self.state {
            WorkflowState::Idle
            | WorkflowState::Validating
            | WorkflowState::NoConflicts { .. }
            | WorkflowState::ConflictsFound { .. }
            | WorkflowState::AwaitingConfirmation { .. } => {
                self.transition(WorkflowState::Cancelled);
                Ok(self.phase())
            }
            _ => Err(self.refuse("cancel")),
        }
    }

    fn confirm(&mut self) -> Result<CommitPlan<E>> {
        match std::mem::replace(&mut self.state, WorkflowState::Committing) {
            WorkflowState::AwaitingConfirmation { plan } => {
                self.enter(Phase::AwaitingConfirmation, WorkflowState::Committing);
                Ok(plan)
            }
            other => {
                self.state = other;
                Err(self.refuse("start committing"))
            }
        }
    }

    /// Confirms and runs the batch to completion, then refreshes `mirror`.
    ///
    /// Holding `mirror` mutably for the whole run keeps every other writer out
    /// while committing. Per-candidate failures never end up here; the only
    /// error is calling this outside `AwaitingConfirmation`.
    ///
    /// If the future is dropped before it finishes (a timeout, a `select!`
    /// branch losing) the workflow goes back to `Idle`. Candidates created up
    /// to that point are already in `mirror`, so submitting the same request
    /// again reports them as conflicts instead of creating them twice.
    pub async fn commit(
        &mut self,
        store: &dyn CatalogStore,
        mirror: &mut CatalogMirror,
    ) -> Result<&BatchSummary<E>> {
        let plan = self.confirm()?;
        tracing::info!(
            "Committing {} {} candidates ({} pre-skipped)",
            plan.len(),
            E::KIND,
            plan.len() - plan.submit_count()
        );

        let mut guard = CommitGuard {
            workflow: &mut *self,
            finished: false,
        };

        let outcomes = BatchCommitter::new(store).run(plan, mirror).await;
        let summary = ResultAggregator::aggregate(outcomes);
        tracing::info!("{}", summary);

        let next = match mirror.refresh(store).await {
            Ok(()) => WorkflowState::Done { summary },
            Err(e) => {
                tracing::error!("Mirror refresh after batch failed: {}", e);
                WorkflowState::Failed {
                    summary,
                    reason: e.to_string(),
                }
            }
        };
        guard.finished = true;
        guard.workflow.transition(next);
        drop(guard);

        match &self.state {
            WorkflowState::Done { summary } | WorkflowState::Failed { summary, .. } => Ok(summary),
            _ => Err(self.refuse("report a summary")),
        }
    }

    pub fn summary(&self) -> Option<&BatchSummary<E>> {
        match &self.state {
            WorkflowState::Done { summary } | WorkflowState::Failed { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Hands the summary to the caller and returns to `Idle`.
    pub fn take_summary(&mut self) -> Result<BatchSummary<E>> {
        match std::mem::replace(&mut self.state, WorkflowState::Idle) {
            WorkflowState::Done { summary } | WorkflowState::Failed { summary, .. } => {
                tracing::debug!("{} workflow: summary taken, back to {}", E::KIND, Phase::Idle);
                Ok(summary)
            }
            other => {
                self.state = other;
                Err(self.refuse("report a summary"))
            }
        }
    }
}

impl ConfirmationWorkflow<Course> {
    /// Expands `request` into grade candidates and screens them.
    pub fn submit_range(
        &mut self,
        expander: &RangeExpander,
        request: &BatchRequest,
        existing: &[Course],
    ) -> Result<Phase> {
        self.begin()?;
        match expander.expand(request) {
            Ok(candidates) => self.screen(candidates, existing),
            Err(e) => {
                self.transition(WorkflowState::Idle);
                Err(e)
            }
        }
    }
}

/// Puts an abandoned commit back to `Idle` so the workflow stays usable.
struct CommitGuard<'w, E: CatalogEntity> {
    workflow: &'w mut ConfirmationWorkflow<E>,
    finished: bool,
}

impl<E: CatalogEntity> Drop for CommitGuard<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("{} commit interrupted before finishing", E::KIND);
            self.workflow.enter(Phase::Committing, WorkflowState::Idle);
        }
    }
}

fn validate_all<D: Candidate>(candidates: &[D]) -> Result<()> {
    if candidates.is_empty() {
        let mut errors = FieldErrors::new();
        errors.insert("candidates", "Nothing to create");
        return errors.into_result();
    }

    if let [single] = candidates {
        return single.validate().into_result();
    }

    let mut errors = FieldErrors::new();
    for (index, candidate) in candidates.iter().enumerate() {
        for (field, message) in candidate.validate().iter() {
            errors.insert(&format!("candidates[{}].{}", index, field), message);
        }
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCatalogStore;
    use crate::domain::model::{
        CourseDraft, EntityId, SchoolYear, SchoolYearDraft, Subject, SubjectDraft, TeacherSlots,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    /// Accepts every listing but never answers a write.
    struct StalledStore;

    #[async_trait]
    impl CatalogStore for StalledStore {
        async fn create_school_year(&self, _: &SchoolYearDraft) -> Result<SchoolYear> {
            std::future::pending().await
        }
        async fn create_subject(&self, _: &SubjectDraft) -> Result<Subject> {
            std::future::pending().await
        }
        async fn create_course(&self, _: &CourseDraft) -> Result<Course> {
            std::future::pending().await
        }
        async fn update_school_year(&self, _: EntityId, _: &SchoolYearDraft) -> Result<SchoolYear> {
            std::future::pending().await
        }
        async fn update_subject(&self, _: EntityId, _: &SubjectDraft) -> Result<Subject> {
            std::future::pending().await
        }
        async fn update_course(&self, _: EntityId, _: &CourseDraft) -> Result<Course> {
            std::future::pending().await
        }
        async fn list_school_years(&self) -> Result<Vec<SchoolYear>> {
            Ok(Vec::new())
        }
        async fn list_subjects(&self) -> Result<Vec<Subject>> {
            Ok(Vec::new())
        }
        async fn list_courses(&self) -> Result<Vec<Course>> {
            Ok(Vec::new())
        }
    }

    fn course(id: i64, year: i64, grade: u8, section: &str) -> Course {
        Course {
            course_id: id,
            school_year_id: year,
            grade: grade.to_string(),
            section: section.to_string(),
            course_name: format!("Grade {} {}", grade, section),
            teachers: TeacherSlots::default(),
        }
    }

    #[test]
    fn test_clean_submission_awaits_confirmation() {
        let mut wf = ConfirmationWorkflow::<Course>::new();
        let phase = wf
            .submit_range(&RangeExpander::default(), &BatchRequest::new(7, "A", 1, 3), &[])
            .unwrap();

        assert_eq!(phase, Phase::AwaitingConfirmation);
        assert_eq!(wf.remainder().len(), 3);
        assert!(wf.conflicts().is_empty());
    }

    #[test]
    fn test_conflicts_require_acknowledgement() {
        let existing = vec![course(1, 7, 2, "A")];
        let mut wf = ConfirmationWorkflow::<Course>::new();

        let phase = wf
            .submit_range(&RangeExpander::default(), &BatchRequest::new(7, "a", 1, 3), &existing)
            .unwrap();
        assert_eq!(phase, Phase::ConflictsFound);
        assert_eq!(wf.conflicting_keys(), vec![NaturalKey::course(7, "2", "A")]);
        assert_eq!(wf.remainder().len(), 2);

        assert_eq!(wf.acknowledge_conflicts().unwrap(), Phase::AwaitingConfirmation);
        assert_eq!(wf.remainder().len(), 2);
    }

    #[test]
    fn test_single_conflict_cannot_be_acknowledged() {
        let existing = vec![SchoolYear {
            school_year_id: 1,
            school_year_code: "2024".to_string(),
        }];
        let mut wf = ConfirmationWorkflow::<SchoolYear>::new();

        let phase = wf.submit(vec![SchoolYearDraft::new("2024")], &existing).unwrap();
        assert_eq!(phase, Phase::ConflictsFound);
        assert!(wf.remainder().is_empty());

        let err = wf.acknowledge_conflicts().unwrap_err();
        assert!(matches!(err, ProvisionError::WorkflowError { .. }));
        assert_eq!(wf.phase(), Phase::ConflictsFound);

        assert_eq!(wf.cancel().unwrap(), Phase::Cancelled);
    }

    #[test]
    fn test_range_error_returns_to_idle() {
        let mut wf = ConfirmationWorkflow::<Course>::new();
        let err = wf
            .submit_range(&RangeExpander::default(), &BatchRequest::new(7, "A", 5, 1), &[])
            .unwrap_err();

        assert!(matches!(err, ProvisionError::RangeError { .. }));
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[test]
    fn test_validation_error_blocks_request() {
        let mut wf = ConfirmationWorkflow::<Course>::new();
        let err = wf
            .submit(vec![CourseDraft::new(1, "", "A")], &[])
            .unwrap_err();

        match err {
            ProvisionError::ValidationError { errors } => assert!(errors.contains("grade")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[test]
    fn test_new_request_refused_while_pending() {
        let mut wf = ConfirmationWorkflow::<Course>::new();
        wf.submit(vec![CourseDraft::new(1, "1", "A")], &[]).unwrap();

        let err = wf.submit(vec![CourseDraft::new(1, "2", "A")], &[]).unwrap_err();
        assert!(matches!(err, ProvisionError::WorkflowError { .. }));
        assert_eq!(wf.phase(), Phase::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn test_commit_reaches_done_and_resets() {
        let store = InMemoryCatalogStore::new();
        let mut mirror = CatalogMirror::new();
        let mut wf = ConfirmationWorkflow::<Course>::new();

        wf.submit_range(&RangeExpander::default(), &BatchRequest::new(7, "A", 1, 4), mirror.courses())
            .unwrap();
        let created = wf.commit(&store, &mut mirror).await.unwrap().created_count();

        assert_eq!(created, 4);
        assert_eq!(wf.phase(), Phase::Done);
        assert_eq!(mirror.courses().len(), 4);

        let summary = wf.take_summary().unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_cancel_not_allowed_after_commit() {
        let store = InMemoryCatalogStore::new();
        let mut mirror = CatalogMirror::new();
        let mut wf = ConfirmationWorkflow::<Course>::new();

        wf.submit(vec![CourseDraft::new(1, "1", "A")], &[]).unwrap();
        wf.commit(&store, &mut mirror).await.unwrap();

        assert!(wf.cancel().is_err());
        assert_eq!(wf.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_commit_requires_confirmation_state() {
        let store = InMemoryCatalogStore::new();
        let mut mirror = CatalogMirror::new();
        let mut wf = ConfirmationWorkflow::<Course>::new();

        assert!(wf.commit(&store, &mut mirror).await.is_err());
        assert_eq!(wf.phase(), Phase::Idle);
        assert_eq!(store.create_calls().await, 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_summary() {
        let store = InMemoryCatalogStore::new();
        store.fail_listing("maintenance window").await;
        let mut mirror = CatalogMirror::new();
        let mut wf = ConfirmationWorkflow::<Course>::new();

        wf.submit(vec![CourseDraft::new(1, "1", "A")], &[]).unwrap();
        let summary = wf.commit(&store, &mut mirror).await.unwrap();
        assert_eq!(summary.created_count(), 1);
        assert_eq!(wf.phase(), Phase::Failed);

        // append-on-success already recorded the new course
        assert_eq!(mirror.courses().len(), 1);
        assert_eq!(wf.take_summary().unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_abandoned_commit_returns_to_idle() {
        let mut mirror = CatalogMirror::new();
        let mut wf = ConfirmationWorkflow::<Course>::new();
        wf.submit(vec![CourseDraft::new(1, "1", "A")], &[]).unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            wf.commit(&StalledStore, &mut mirror),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(wf.phase(), Phase::Idle);

        // 仍可接受新的請求
        let phase = wf.submit(vec![CourseDraft::new(1, "1", "A")], &[]).unwrap();
        assert_eq!(phase, Phase::AwaitingConfirmation);
    }
}
