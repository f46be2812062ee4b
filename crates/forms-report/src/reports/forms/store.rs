use std::collections::{HashMap, HashSet};

use super::aggregate::AggregateMap;
use super::domain::{Submission, SubmissionChildren, SubmissionId, SubmissionRecord};
use super::pagination::SortSpec;
use super::predicates::RowPredicates;

/// Surviving submission ids after post-aggregation filtering.
pub type IdRestriction = HashSet<SubmissionId>;

/// Read-only storage the report engine runs against.
///
/// Implementations must answer each call with a single batched query and
/// must not cache across calls; the engine keeps no state between requests.
pub trait SubmissionStore: Send + Sync {
    fn query_row_candidates(
        &self,
        predicates: &RowPredicates,
    ) -> Result<Vec<SubmissionId>, StoreError>;

    fn fetch_aggregates(&self, ids: &[SubmissionId]) -> Result<AggregateMap, StoreError>;

    fn fetch_page(
        &self,
        predicates: &RowPredicates,
        restriction: Option<&IdRestriction>,
        sort: &SortSpec,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Submission>, StoreError>;

    fn count_matching(
        &self,
        predicates: &RowPredicates,
        restriction: Option<&IdRestriction>,
    ) -> Result<usize, StoreError>;

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, StoreError>;

    fn fetch_children(
        &self,
        ids: &[SubmissionId],
    ) -> Result<HashMap<SubmissionId, SubmissionChildren>, StoreError>;
}

/// Storage failure. Never retried by the engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
    #[error("submission {0} already exists")]
    Conflict(SubmissionId),
    #[error("submission store returned inconsistent data: {0}")]
    Corrupt(String),
}
