use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::aggregate::{totals_for, AggregateMap};
use super::domain::{Submission, SubmissionChildren, SubmissionId};
use super::filters::FilterRequest;
use super::pagination::{PageRequest, SortSpec};
use super::planner::QueryPlanner;
use super::predicates::{compile, CompiledFilters, PeriodMatch};
use super::store::SubmissionStore;
use super::views::{
    form_row, restrict_row, CompanyRollup, ExportFile, FormDetails, FormListItem, FormListPage,
    ReportPreview,
};
use crate::reports::error::ReportError;
use crate::reports::export::{
    build_csv, CsvColumn, ExportLimits, ExportMetadata, ReportRow, SizeEstimate, PREVIEW_ROWS,
};
use crate::reports::registry::{ColumnDef, ReportDefinition, ReportRegistry, ReportType};

/// Engine knobs resolved from configuration at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub period_match: PeriodMatch,
    pub limits: ExportLimits,
    pub preview_rows: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            period_match: PeriodMatch::default(),
            limits: ExportLimits::default(),
            preview_rows: PREVIEW_ROWS,
        }
    }
}

/// Inputs shared by preview and export.
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'a> {
    pub report: ReportType,
    pub filters: &'a FilterRequest,
    pub sort: SortSpec,
    /// Column keys the caller may see; `None` means every registry column.
    pub allowed: Option<&'a [String]>,
}

impl<'a> ReportRequest<'a> {
    pub fn new(report: ReportType, filters: &'a FilterRequest) -> Self {
        Self {
            report,
            filters,
            sort: SortSpec::default(),
            allowed: None,
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_allowed(mut self, allowed: Option<&'a [String]>) -> Self {
        self.allowed = allowed;
        self
    }
}

/// Rows of one report type, already projected and narrowed to `columns`.
struct Materialized {
    columns: Vec<ColumnDef>,
    rows: Vec<ReportRow>,
    total: usize,
}

/// Stateless per call: every operation reads the store afresh.
pub struct FormsReportService<S> {
    store: Arc<S>,
    registry: Arc<ReportRegistry>,
    settings: ReportSettings,
}

impl<S> FormsReportService<S>
where
    S: SubmissionStore + 'static,
{
    pub fn new(store: Arc<S>, registry: Arc<ReportRegistry>, settings: ReportSettings) -> Self {
        Self {
            store,
            registry,
            settings,
        }
    }

    pub fn registry(&self) -> &ReportRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn compile_for(
        &self,
        definition: &ReportDefinition,
        filters: &FilterRequest,
    ) -> Result<CompiledFilters, ReportError> {
        definition.ensure_filters_supported(filters)?;
        Ok(compile(filters, self.settings.period_match))
    }

    pub fn list_forms(
        &self,
        filters: &FilterRequest,
        sort: &SortSpec,
        page: PageRequest,
    ) -> Result<FormListPage, ReportError> {
        let definition = self.registry.definition(ReportType::FormsList)?;
        let compiled = self.compile_for(definition, filters)?;
        let planner = QueryPlanner::new(self.store.as_ref());

        let planned = planner.run(&compiled, sort, page.page_size(), page.offset())?;
        let aggregates = planner.project(&planned.rows)?;
        let items = planned
            .rows
            .iter()
            .map(|submission| {
                FormListItem::project(submission, totals_for(&aggregates, &submission.id))
            })
            .collect();

        Ok(FormListPage {
            page: page.page(),
            page_size: page.page_size(),
            total: planned.total,
            items,
        })
    }

    pub fn get_form_by_id(&self, id: &SubmissionId) -> Result<Option<FormDetails>, ReportError> {
        Ok(self
            .store
            .fetch_submission(id)?
            .map(|record| FormDetails::new(record.submission, record.children)))
    }

    pub fn preview_report(&self, request: ReportRequest<'_>) -> Result<ReportPreview, ReportError> {
        let materialized = self.materialize(&request, false, self.settings.preview_rows)?;
        Ok(ReportPreview {
            report: request.report,
            columns: materialized.columns,
            rows: materialized.rows,
            total: materialized.total,
        })
    }

    pub fn export_report(
        &self,
        request: ReportRequest<'_>,
        full_export: bool,
    ) -> Result<ExportFile, ReportError> {
        self.export_report_at(request, full_export, Utc::now())
    }

    /// Export with an explicit generation timestamp for metadata and file name.
    pub fn export_report_at(
        &self,
        request: ReportRequest<'_>,
        full_export: bool,
        generated_at: DateTime<Utc>,
    ) -> Result<ExportFile, ReportError> {
        let row_cap = if full_export {
            self.settings.limits.max_rows
        } else {
            self.settings.preview_rows
        };
        let materialized = self.materialize(&request, full_export, row_cap)?;

        let columns: Vec<CsvColumn> = materialized
            .columns
            .iter()
            .map(|column| CsvColumn::new(column.key, column.label))
            .collect();
        let metadata = ExportMetadata::new()
            .with("report", request.report.id())
            .with("generatedAt", generated_at.format("%Y-%m-%dT%H:%M:%SZ"))
            .with("rows", materialized.rows.len())
            .with("total", materialized.total)
            .with("columns", columns.len())
            .with("filters", request.filters.summary());
        let bytes = build_csv(&columns, &materialized.rows, &metadata)?;

        info!(
            report = request.report.id(),
            rows = materialized.rows.len(),
            bytes = bytes.len(),
            full_export,
            "report export generated"
        );
        Ok(ExportFile {
            report: request.report,
            file_name: export_file_name(request.report, generated_at),
            rows: materialized.rows.len(),
            bytes,
        })
    }

    /// Counts first and, for full exports, rejects oversized results before
    /// any row is fetched.
    fn materialize(
        &self,
        request: &ReportRequest<'_>,
        full_export: bool,
        row_cap: usize,
    ) -> Result<Materialized, ReportError> {
        let definition = self.registry.definition(request.report)?;
        let compiled = self.compile_for(definition, request.filters)?;
        let columns = definition.visible_columns(full_export, request.allowed);

        let planner = QueryPlanner::new(self.store.as_ref());
        let scope = planner.resolve_scope(&compiled)?;
        let matching = planner.count(&compiled, &scope)?;

        if full_export {
            let headers: Vec<&str> = columns.iter().map(|column| column.label).collect();
            let estimate = SizeEstimate::new(matching, &headers, true).bytes();
            if let Err(exceeded) = self.settings.limits.check(matching, estimate) {
                warn!(
                    report = request.report.id(),
                    rows = matching,
                    estimated_bytes = estimate,
                    limit = ?exceeded.limit,
                    "export rejected before generation"
                );
                return Err(exceeded.into());
            }
        }

        match request.report {
            ReportType::FormsList => {
                let submissions =
                    planner.fetch_rows(&compiled, &scope, &request.sort, row_cap, 0)?;
                let aggregates = planner.project(&submissions)?;
                let children = if full_export {
                    self.hydrate(&submissions)?
                } else {
                    HashMap::new()
                };
                let rows = submissions
                    .iter()
                    .map(|submission| {
                        form_row(
                            submission,
                            totals_for(&aggregates, &submission.id),
                            children.get(&submission.id),
                        )
                        .map(|row| restrict_row(row, &columns))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Materialized {
                    columns,
                    rows,
                    total: matching,
                })
            }
            ReportType::CompaniesList => {
                // Grouping needs every matching submission, so the row cap
                // guards previews here too.
                if !full_export {
                    self.settings.limits.check(matching, 0)?;
                }
                let submissions =
                    planner.fetch_rows(&compiled, &scope, &request.sort, matching, 0)?;
                let aggregates = planner.project(&submissions)?;
                let companies = roll_up_companies(&submissions, &aggregates);
                let total = companies.len();
                let rows = companies
                    .iter()
                    .take(row_cap)
                    .map(|company| restrict_row(company.to_row(), &columns))
                    .collect();
                Ok(Materialized {
                    columns,
                    rows,
                    total,
                })
            }
        }
    }

    fn hydrate(
        &self,
        submissions: &[Submission],
    ) -> Result<HashMap<SubmissionId, SubmissionChildren>, ReportError> {
        if submissions.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<SubmissionId> = submissions.iter().map(|row| row.id.clone()).collect();
        Ok(self.store.fetch_children(&ids)?)
    }
}

impl<S> Clone for FormsReportService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            settings: self.settings,
        }
    }
}

/// Groups by company code in first-seen order of the sorted submissions.
/// The latest submission by creation time supplies the company snapshot.
fn roll_up_companies<'a>(
    submissions: &'a [Submission],
    aggregates: &AggregateMap,
) -> Vec<CompanyRollup<'a>> {
    let mut order: Vec<CompanyRollup<'a>> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for submission in submissions {
        let totals = totals_for(aggregates, &submission.id);
        match positions.get(submission.company_code.as_str()) {
            Some(&index) => {
                let entry = &mut order[index];
                entry.submissions += 1;
                if submission.created_at > entry.latest.created_at {
                    entry.latest = submission;
                    entry.latest_totals = totals;
                }
            }
            None => {
                positions.insert(submission.company_code.as_str(), order.len());
                order.push(CompanyRollup {
                    latest: submission,
                    latest_totals: totals,
                    submissions: 1,
                });
            }
        }
    }
    order
}

pub fn export_file_name(report: ReportType, generated_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.csv",
        report.id(),
        generated_at.format("%Y%m%d-%H%M%S")
    )
}
