use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use super::aggregate::{aggregate_rows, AggregateMap};
use super::domain::{Submission, SubmissionChildren, SubmissionId, SubmissionRecord};
use super::pagination::{SortColumn, SortDirection, SortSpec};
use super::predicates::RowPredicates;
use super::store::{IdRestriction, StoreError, SubmissionStore};

/// Process-local store used by the demo server, the CLI and tests.
#[derive(Default, Clone)]
pub struct InMemorySubmissionStore {
    records: Arc<RwLock<Records>>,
}

/// Insertion-ordered rows plus a position index keyed by id.
#[derive(Default)]
struct Records {
    rows: Vec<SubmissionRecord>,
    positions: HashMap<SubmissionId, usize>,
}

impl Records {
    fn get(&self, id: &SubmissionId) -> Option<&SubmissionRecord> {
        self.positions.get(id).and_then(|&index| self.rows.get(index))
    }

    /// Each requested id at most once, skipping unknown ids.
    fn lookup<'a>(
        &'a self,
        ids: &'a [SubmissionId],
    ) -> impl Iterator<Item = &'a SubmissionRecord> + 'a {
        let mut seen: HashSet<&SubmissionId> = HashSet::with_capacity(ids.len());
        ids.iter()
            .filter(move |id| seen.insert(*id))
            .filter_map(move |id| self.get(id))
    }
}

impl InMemorySubmissionStore {
    pub fn from_records(records: Vec<SubmissionRecord>) -> Result<Self, StoreError> {
        let store = Self::default();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Records are append-only; a duplicate id is rejected.
    pub fn insert(&self, record: SubmissionRecord) -> Result<(), StoreError> {
        let submission = &record.submission;
        if submission.reporting_to < submission.reporting_from {
            return Err(StoreError::Corrupt(format!(
                "submission {} reports from {} to {}",
                submission.id, submission.reporting_from, submission.reporting_to
            )));
        }
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        if guard.positions.contains_key(&record.submission.id) {
            return Err(StoreError::Conflict(record.submission.id));
        }
        let position = guard.rows.len();
        guard.positions.insert(record.submission.id.clone(), position);
        guard.rows.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

fn selected<'a>(
    records: &'a [SubmissionRecord],
    predicates: &'a RowPredicates,
    restriction: Option<&'a IdRestriction>,
) -> impl Iterator<Item = &'a Submission> + 'a {
    records
        .iter()
        .map(|record| &record.submission)
        .filter(move |submission| predicates.matches(submission))
        .filter(move |submission| restriction.map_or(true, |ids| ids.contains(&submission.id)))
}

fn compare(column: SortColumn, left: &Submission, right: &Submission) -> Ordering {
    match column {
        SortColumn::CreatedAt => left.created_at.cmp(&right.created_at),
        SortColumn::CompanyName => left
            .company_name
            .to_lowercase()
            .cmp(&right.company_name.to_lowercase()),
        SortColumn::CompanyCode => left.company_code.cmp(&right.company_code),
        SortColumn::CompanyType => left.company_type.code().cmp(right.company_type.code()),
        SortColumn::Country => left.country.cmp(&right.country),
        SortColumn::ReportingFrom => left.reporting_from.cmp(&right.reporting_from),
        SortColumn::ReportingTo => left.reporting_to.cmp(&right.reporting_to),
    }
}

impl SubmissionStore for InMemorySubmissionStore {
    fn query_row_candidates(
        &self,
        predicates: &RowPredicates,
    ) -> Result<Vec<SubmissionId>, StoreError> {
        let guard = self.read()?;
        Ok(selected(&guard.rows, predicates, None)
            .map(|submission| submission.id.clone())
            .collect())
    }

    fn fetch_aggregates(&self, ids: &[SubmissionId]) -> Result<AggregateMap, StoreError> {
        let guard = self.read()?;
        let rows = guard.lookup(ids).flat_map(|record| {
            record
                .children
                .gender_balance
                .iter()
                .map(move |row| (&record.submission.id, row))
        });
        Ok(aggregate_rows(rows, ids))
    }

    fn fetch_page(
        &self,
        predicates: &RowPredicates,
        restriction: Option<&IdRestriction>,
        sort: &SortSpec,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Submission>, StoreError> {
        let guard = self.read()?;
        let mut rows: Vec<&Submission> = selected(&guard.rows, predicates, restriction).collect();
        rows.sort_by(|left, right| {
            let ordering = compare(sort.column, left, right);
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_matching(
        &self,
        predicates: &RowPredicates,
        restriction: Option<&IdRestriction>,
    ) -> Result<usize, StoreError> {
        let guard = self.read()?;
        Ok(selected(&guard.rows, predicates, restriction).count())
    }

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, StoreError> {
        let guard = self.read()?;
        Ok(guard.get(id).cloned())
    }

    fn fetch_children(
        &self,
        ids: &[SubmissionId],
    ) -> Result<HashMap<SubmissionId, SubmissionChildren>, StoreError> {
        let guard = self.read()?;
        Ok(guard
            .lookup(ids)
            .map(|record| (record.submission.id.clone(), record.children.clone()))
            .collect())
    }
}
