use crate::core::committer::CommitOutcome;
use crate::core::entity::{Candidate, CatalogEntity};
use crate::domain::model::EntityKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Final accounting of a batch. Every candidate lands in exactly one bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary<E> {
    pub kind: EntityKind,
    pub total: usize,
    pub created: Vec<E>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl<E> BatchSummary<E> {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl<E> fmt::Display for BatchSummary<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch: {} created, {} skipped, {} failed ({} total)",
            self.kind,
            self.created_count(),
            self.skipped_count(),
            self.failed_count(),
            self.total
        )
    }
}

pub struct ResultAggregator;

impl ResultAggregator {
    pub fn aggregate<E: CatalogEntity>(outcomes: Vec<CommitOutcome<E>>) -> BatchSummary<E> {
        let total = outcomes.len();
        let mut created = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for outcome in outcomes {
            match outcome {
                CommitOutcome::Created(entity) => created.push(entity),
                CommitOutcome::SkippedDuplicate {
                    candidate,
                    existing: Some(existing),
                } => skipped.push(format!(
                    "{} (already exists as #{})",
                    candidate.label(),
                    existing.id()
                )),
                CommitOutcome::SkippedDuplicate { candidate, .. } => {
                    skipped.push(format!("{} (already exists)", candidate.label()))
                }
                CommitOutcome::Failed { candidate, reason } => {
                    failed.push(format!("{}: {}", candidate.label(), reason))
                }
            }
        }

        BatchSummary {
            kind: E::KIND,
            total,
            created,
            skipped,
            failed,
            completed_at: Utc::now(),
        }
    }
}
