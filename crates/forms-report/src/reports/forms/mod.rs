pub mod aggregate;
pub mod domain;
pub mod filters;
pub mod memory;
pub mod pagination;
pub mod planner;
pub mod predicates;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use aggregate::{GenderPercentages, GenderTotals};
pub use domain::{
    CompanyType, GenderBalanceRow, GenderRole, Submission, SubmissionChildren, SubmissionId,
    SubmissionRecord,
};
pub use filters::{FilterRequest, FormsQuery, GenderAlignment, GenderImbalance, ParsedQuery};
pub use memory::InMemorySubmissionStore;
pub use pagination::{PageRequest, SortDirection, SortKey, SortSpec};
pub use predicates::PeriodMatch;
pub use service::{FormsReportService, ReportRequest, ReportSettings};
pub use store::{StoreError, SubmissionStore};
pub use views::{ExportFile, FormDetails, FormListItem, FormListPage, ReportPreview};
