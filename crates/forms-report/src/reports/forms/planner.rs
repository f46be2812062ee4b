//! Two-phase query planning.
//!
//! Row predicates run first. Only when a post-aggregation predicate is active
//! are candidate ids materialised, aggregated and narrowed before the final
//! fetch; otherwise the row predicates go straight into the final query.

use super::aggregate::{totals_for, AggregateMap};
use super::domain::{Submission, SubmissionId};
use super::predicates::CompiledFilters;
use super::pagination::SortSpec;
use super::store::{IdRestriction, StoreError, SubmissionStore};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanPhase {
    RowFilter,
    AggregatePreselect,
    PostFilter,
    FinalFetch,
    Project,
}

/// Rows eligible for the final fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Nothing can match; skip the remaining phases.
    Empty,
    /// Row predicates alone decide membership.
    Rows,
    /// Row predicates plus the surviving id set.
    Restricted(IdRestriction),
}

impl Scope {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn restriction(&self) -> Option<&IdRestriction> {
        match self {
            Self::Restricted(ids) => Some(ids),
            Self::Empty | Self::Rows => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedPage {
    pub total: usize,
    pub rows: Vec<Submission>,
}

pub struct QueryPlanner<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> QueryPlanner<'a, S>
where
    S: SubmissionStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Runs the row filter, aggregate preselect and post filter phases.
    pub fn resolve_scope(&self, filters: &CompiledFilters) -> Result<Scope, StoreError> {
        if !filters.post.is_active() {
            return Ok(Scope::Rows);
        }

        debug!(phase = ?PlanPhase::RowFilter, predicates = filters.row.len(), clause = %filters.row.to_sql().clause, "collecting candidates");
        let candidates = self.store.query_row_candidates(&filters.row)?;
        if candidates.is_empty() {
            debug!(phase = ?PlanPhase::RowFilter, "no candidates; short-circuit");
            return Ok(Scope::Empty);
        }

        debug!(phase = ?PlanPhase::AggregatePreselect, candidates = candidates.len(), "aggregating candidates");
        let aggregates = self.store.fetch_aggregates(&candidates)?;

        let surviving: IdRestriction = candidates
            .into_iter()
            .filter(|id| filters.post.retains(&totals_for(&aggregates, id)))
            .collect();
        debug!(phase = ?PlanPhase::PostFilter, surviving = surviving.len(), post = ?filters.post, "post-aggregation filter applied");

        if surviving.is_empty() {
            return Ok(Scope::Empty);
        }
        Ok(Scope::Restricted(surviving))
    }

    pub fn count(&self, filters: &CompiledFilters, scope: &Scope) -> Result<usize, StoreError> {
        if scope.is_empty() {
            return Ok(0);
        }
        self.store.count_matching(&filters.row, scope.restriction())
    }

    pub fn fetch_rows(
        &self,
        filters: &CompiledFilters,
        scope: &Scope,
        sort: &SortSpec,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Submission>, StoreError> {
        if scope.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        debug!(phase = ?PlanPhase::FinalFetch, limit, offset, order = %sort.order_by_sql(), "fetching rows");
        self.store
            .fetch_page(&filters.row, scope.restriction(), sort, limit, offset)
    }

    /// Count and page under one scope, so `total` reflects every filter phase.
    pub fn run(
        &self,
        filters: &CompiledFilters,
        sort: &SortSpec,
        limit: usize,
        offset: usize,
    ) -> Result<PlannedPage, StoreError> {
        let scope = self.resolve_scope(filters)?;
        if scope.is_empty() {
            return Ok(PlannedPage::default());
        }
        let total = self.count(filters, &scope)?;
        let rows = self.fetch_rows(filters, &scope, sort, limit, offset)?;
        Ok(PlannedPage { total, rows })
    }

    /// Fresh aggregates for the fetched rows only. The preselect map is not
    /// reused because it was computed over a different id universe.
    pub fn project(&self, rows: &[Submission]) -> Result<AggregateMap, StoreError> {
        if rows.is_empty() {
            return Ok(AggregateMap::new());
        }
        let ids: Vec<SubmissionId> = rows.iter().map(|row| row.id.clone()).collect();
        debug!(phase = ?PlanPhase::Project, rows = ids.len(), "aggregating page");
        self.store.fetch_aggregates(&ids)
    }
}
