use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::reports::forms::aggregate::AggregateMap;
use crate::reports::forms::domain::{
    Attachment, CompanyType, GenderBalanceRow, GenderRole, Submission, SubmissionChildren,
    SubmissionId, SubmissionMeta, SubmissionRecord,
};
use crate::reports::forms::memory::InMemorySubmissionStore;
use crate::reports::forms::pagination::SortSpec;
use crate::reports::forms::predicates::RowPredicates;
use crate::reports::forms::service::{FormsReportService, ReportSettings};
use crate::reports::forms::store::{IdRestriction, StoreError, SubmissionStore};
use crate::reports::registry::ReportRegistry;

pub(super) fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

pub(super) fn instant(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().expect("valid instant")
}

pub(super) fn submission(id: &str, code: &str, name: &str) -> Submission {
    Submission {
        id: SubmissionId::new(id),
        company_code: code.to_string(),
        company_name: name.to_string(),
        company_type: CompanyType::Listed,
        country: "LT".to_string(),
        legal_form: "AB".to_string(),
        address: "Gedimino pr. 1, Vilnius".to_string(),
        registry: "Register of Legal Entities".to_string(),
        e_delivery_address: None,
        reporting_from: day("2024-01-01"),
        reporting_to: day("2024-12-31"),
        contact_name: "Rasa Petraitė".to_string(),
        contact_email: "reports@example.com".to_string(),
        contact_phone: Some("+37060000000".to_string()),
        consent: true,
        consent_text: Some("I confirm the data is accurate.".to_string()),
        requirements_applied: false,
        requirements_link: None,
        notes: None,
        created_at: instant("2025-01-10T09:00:00Z"),
    }
}

pub(super) fn board_row(women: u32, men: u32, total: u32) -> GenderBalanceRow {
    GenderBalanceRow {
        role: GenderRole::Board,
        women,
        men,
        total,
    }
}

pub(super) fn record(submission: Submission, rows: Vec<GenderBalanceRow>) -> SubmissionRecord {
    SubmissionRecord {
        submission,
        children: SubmissionChildren {
            gender_balance: rows,
            ..SubmissionChildren::default()
        },
    }
}

/// Two submissions: (10 women, 20 men) and (5 women, 25 men).
pub(super) fn alignment_records() -> Vec<SubmissionRecord> {
    let mut aligned = submission("s-a", "ALPHA", "Alpha Group");
    aligned.created_at = instant("2025-01-01T10:00:00Z");
    let mut skewed = submission("s-b", "BRAVO", "Bravo Group");
    skewed.created_at = instant("2025-01-02T10:00:00Z");
    vec![
        record(aligned, vec![board_row(10, 20, 30)]),
        record(skewed, vec![board_row(5, 25, 30)]),
    ]
}

/// Five submissions across four companies.
///
/// | id  | company | type       | created          | period                | women/men/total |
/// |-----|---------|------------|------------------|-----------------------|-----------------|
/// | s-1 | ACME-1  | LISTED     | 2025-01-10 09:00 | 2024-01-01/2024-12-31 | 10/20/30 (33%)  |
/// | s-2 | BETA-2  | STATE      | 2025-02-15 12:30 | 2024-01-01/2024-12-31 | 5/25/30 (17%)   |
/// | s-3 | ACME-1  | LISTED     | 2025-03-01 08:00 | 2025-01-01/2025-06-30 | 6/6/12 (50%)    |
/// | s-4 | GAMMA-3 | MUNICIPAL  | 2025-03-20 16:45 | 2024-07-01/2025-06-30 | none (0%)       |
/// | s-5 | DELTA-4 | OTHER      | 2025-04-02 10:00 | 2023-01-01/2023-12-31 | 7/3/0 (70%)     |
pub(super) fn fixture_records() -> Vec<SubmissionRecord> {
    let first = submission("s-1", "ACME-1", "Acme Holdings");

    let mut second = submission("s-2", "BETA-2", "Beta Energy");
    second.company_type = CompanyType::StateOwned;
    second.created_at = instant("2025-02-15T12:30:00Z");

    let mut third = submission("s-3", "ACME-1", "Acme Holdings Group");
    third.created_at = instant("2025-03-01T08:00:00Z");
    third.reporting_from = day("2025-01-01");
    third.reporting_to = day("2025-06-30");
    third.requirements_applied = true;
    third.requirements_link = Some("https://acme.example/diversity".to_string());

    let mut fourth = submission("s-4", "GAMMA-3", "Gamma Transport");
    fourth.company_type = CompanyType::MunicipalityOwned;
    fourth.created_at = instant("2025-03-20T16:45:00Z");
    fourth.reporting_from = day("2024-07-01");
    fourth.reporting_to = day("2025-06-30");

    let mut fifth = submission("s-5", "DELTA-4", "Delta, \"Nordic\" Bank");
    fifth.company_type = CompanyType::Other;
    fifth.created_at = instant("2025-04-02T10:00:00Z");
    fifth.reporting_from = day("2023-01-01");
    fifth.reporting_to = day("2023-12-31");
    fifth.notes = Some("Board renewed\nin March".to_string());

    let mut third_record = record(third, vec![board_row(2, 2, 4), board_row(4, 4, 8)]);
    third_record.children.attachments.push(Attachment {
        file_name: "policy.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        size_bytes: 2048,
        storage_key: "forms/s-3/policy.pdf".to_string(),
    });
    third_record.children.meta = Some(SubmissionMeta {
        locale: "lt".to_string(),
        user_agent: None,
        source: Some("web".to_string()),
    });

    vec![
        record(first, vec![board_row(10, 20, 30)]),
        record(second, vec![board_row(5, 25, 30)]),
        third_record,
        record(fourth, Vec::new()),
        record(fifth, vec![board_row(7, 3, 0)]),
    ]
}

pub(super) fn memory_store(records: Vec<SubmissionRecord>) -> InMemorySubmissionStore {
    InMemorySubmissionStore::from_records(records).expect("unique fixture ids")
}

pub(super) fn build_service<S>(store: S) -> FormsReportService<S>
where
    S: SubmissionStore + 'static,
{
    build_service_with(store, ReportSettings::default())
}

pub(super) fn build_service_with<S>(store: S, settings: ReportSettings) -> FormsReportService<S>
where
    S: SubmissionStore + 'static,
{
    FormsReportService::new(
        Arc::new(store),
        Arc::new(ReportRegistry::standard()),
        settings,
    )
}

pub(super) fn fixture_service() -> FormsReportService<InMemorySubmissionStore> {
    build_service(memory_store(fixture_records()))
}

pub(super) fn ids(items: impl IntoIterator<Item = SubmissionId>) -> Vec<String> {
    items.into_iter().map(|id| id.0).collect()
}

pub(super) fn default_sort() -> SortSpec {
    SortSpec::default()
}

/// Delegates to an in-memory store and counts every storage call.
#[derive(Default)]
pub(super) struct CountingStore {
    inner: InMemorySubmissionStore,
    pub(super) candidate_queries: AtomicUsize,
    pub(super) aggregate_queries: AtomicUsize,
    pub(super) page_queries: AtomicUsize,
    pub(super) count_queries: AtomicUsize,
    pub(super) children_queries: AtomicUsize,
}

impl CountingStore {
    pub(super) fn new(records: Vec<SubmissionRecord>) -> Self {
        Self {
            inner: memory_store(records),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> StoreCalls {
        StoreCalls {
            candidates: self.candidate_queries.load(Ordering::SeqCst),
            aggregates: self.aggregate_queries.load(Ordering::SeqCst),
            pages: self.page_queries.load(Ordering::SeqCst),
            counts: self.count_queries.load(Ordering::SeqCst),
            children: self.children_queries.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct StoreCalls {
    pub(super) candidates: usize,
    pub(super) aggregates: usize,
    pub(super) pages: usize,
    pub(super) counts: usize,
    pub(super) children: usize,
}

impl SubmissionStore for CountingStore {
    fn query_row_candidates(
        &self,
        predicates: &RowPredicates,
    ) -> Result<Vec<SubmissionId>, StoreError> {
        self.candidate_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_row_candidates(predicates)
    }

    fn fetch_aggregates(&self, ids: &[SubmissionId]) -> Result<AggregateMap, StoreError> {
        self.aggregate_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_aggregates(ids)
    }

    fn fetch_page(
        &self,
        predicates: &RowPredicates,
        restriction: Option<&IdRestriction>,
        sort: &SortSpec,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Submission>, StoreError> {
        self.page_queries.fetch_add(1, Ordering::SeqCst);
        self.inner
            .fetch_page(predicates, restriction, sort, limit, offset)
    }

    fn count_matching(
        &self,
        predicates: &RowPredicates,
        restriction: Option<&IdRestriction>,
    ) -> Result<usize, StoreError> {
        self.count_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.count_matching(predicates, restriction)
    }

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, StoreError> {
        self.inner.fetch_submission(id)
    }

    fn fetch_children(
        &self,
        ids: &[SubmissionId],
    ) -> Result<HashMap<SubmissionId, SubmissionChildren>, StoreError> {
        self.children_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_children(ids)
    }
}

pub(super) struct UnavailableStore;

impl SubmissionStore for UnavailableStore {
    fn query_row_candidates(
        &self,
        _predicates: &RowPredicates,
    ) -> Result<Vec<SubmissionId>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_aggregates(&self, _ids: &[SubmissionId]) -> Result<AggregateMap, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_page(
        &self,
        _predicates: &RowPredicates,
        _restriction: Option<&IdRestriction>,
        _sort: &SortSpec,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<Submission>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn count_matching(
        &self,
        _predicates: &RowPredicates,
        _restriction: Option<&IdRestriction>,
    ) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_submission(&self, _id: &SubmissionId) -> Result<Option<SubmissionRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_children(
        &self,
        _ids: &[SubmissionId],
    ) -> Result<HashMap<SubmissionId, SubmissionChildren>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
