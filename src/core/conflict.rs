use crate::core::entity::{Candidate, CatalogEntity, NaturalKey};
use crate::domain::model::EntityId;

/// A candidate whose natural key is already taken.
#[derive(Debug, Clone)]
pub struct Conflict<E: CatalogEntity> {
    pub candidate: E::Draft,
    pub key: NaturalKey,
    pub existing: E,
}

#[derive(Debug, Clone)]
pub enum Screened<E: CatalogEntity> {
    Clear(E::Draft),
    Conflicting(Conflict<E>),
}

/// Local natural-key lookup against a caller-supplied collection.
///
/// No I/O: the answer is only as fresh as the slice passed in.
pub struct ConflictDetector;

impl ConflictDetector {
    /// First entity in `existing` with the same key, skipping `excluding`.
    pub fn find<'a, E: CatalogEntity>(
        key: &NaturalKey,
        existing: &'a [E],
        excluding: Option<EntityId>,
    ) -> Option<&'a E> {
        existing
            .iter()
            .filter(|e| Some(e.id()) != excluding)
            .find(|e| &e.natural_key() == key)
    }

    pub fn check<'a, E: CatalogEntity>(draft: &E::Draft, existing: &'a [E]) -> Option<&'a E> {
        let key = draft.natural_key()?;
        Self::find(&key, existing, None)
    }

    /// Same as [`check`](Self::check) but an entity never conflicts with itself.
    pub fn check_edit<'a, E: CatalogEntity>(
        id: EntityId,
        draft: &E::Draft,
        existing: &'a [E],
    ) -> Option<&'a E> {
        let key = draft.natural_key()?;
        Self::find(&key, existing, Some(id))
    }

    /// Splits candidates into clear and conflicting, preserving input order.
    pub fn screen<E: CatalogEntity>(candidates: Vec<E::Draft>, existing: &[E]) -> Vec<Screened<E>> {
        candidates
            .into_iter()
            .map(|candidate| match candidate.natural_key() {
                Some(key) => match Self::find(&key, existing, None) {
                    Some(found) => Screened::Conflicting(Conflict {
                        candidate,
                        key,
                        existing: found.clone(),
                    }),
                    None => Screened::Clear(candidate),
                },
                None => Screened::Clear(candidate),
            })
            .collect()
    }
}
