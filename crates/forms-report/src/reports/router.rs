use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::error::{ReportError, ValidationError};
use super::forms::filters::FormsQuery;
use super::forms::service::{FormsReportService, ReportRequest};
use super::forms::store::SubmissionStore;
use super::forms::SubmissionId;
use super::registry::ReportType;
use crate::error::AppError;

/// Comma-separated column keys the caller may see, set by the auth layer.
pub const ALLOWED_COLUMNS_HEADER: &str = "x-allowed-columns";

/// Admin endpoints for the forms list, detail view, previews and exports.
pub fn forms_router<S>(service: Arc<FormsReportService<S>>) -> Router
where
    S: SubmissionStore + 'static,
{
    Router::new()
        .route("/api/v1/admin/forms", get(list_handler::<S>))
        .route("/api/v1/admin/forms/:submission_id", get(detail_handler::<S>))
        .route("/api/v1/admin/reports", get(definitions_handler::<S>))
        .route(
            "/api/v1/admin/reports/:report_type/preview",
            get(preview_handler::<S>),
        )
        .route(
            "/api/v1/admin/reports/:report_type/export",
            get(export_handler::<S>),
        )
        .with_state(service)
}

/// Absent header means no restriction. A present header that is not
/// visible ASCII is rejected rather than read as "no restriction".
pub(crate) fn allowed_columns(
    headers: &HeaderMap,
) -> Result<Option<Vec<String>>, ValidationError> {
    let Some(value) = headers.get(ALLOWED_COLUMNS_HEADER) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| {
        ValidationError::new(
            ALLOWED_COLUMNS_HEADER,
            "column list must be comma-separated visible ASCII",
        )
    })?;
    Ok(Some(
        raw.split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

fn error_response(error: ReportError) -> Response {
    match error {
        ReportError::LimitExceeded(exceeded) => {
            let payload = json!({
                "error": exceeded.to_string(),
                "limit": exceeded.limit,
                "value": exceeded.value,
                "max": exceeded.max,
            });
            (StatusCode::PAYLOAD_TOO_LARGE, Json(payload)).into_response()
        }
        other => AppError::from(other).into_response(),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<FormsReportService<S>>>,
    Query(query): Query<FormsQuery>,
) -> Response
where
    S: SubmissionStore + 'static,
{
    let parsed = match query.parse() {
        Ok(parsed) => parsed,
        Err(error) => return error_response(error.into()),
    };
    match service.list_forms(&parsed.filters, &parsed.sort, parsed.page) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<FormsReportService<S>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
{
    let id = SubmissionId(submission_id);
    match service.get_form_by_id(&id) {
        Ok(Some(details)) => (StatusCode::OK, Json(details)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": format!("submission {id} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn definitions_handler<S>(
    State(service): State<Arc<FormsReportService<S>>>,
) -> Response
where
    S: SubmissionStore + 'static,
{
    let payload = json!({ "reports": service.registry().definitions() });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn preview_handler<S>(
    State(service): State<Arc<FormsReportService<S>>>,
    Path(report_type): Path<String>,
    Query(query): Query<FormsQuery>,
    headers: HeaderMap,
) -> Response
where
    S: SubmissionStore + 'static,
{
    let (report, parsed) = match parse_report_request(&report_type, &query) {
        Ok(parts) => parts,
        Err(error) => return error_response(error.into()),
    };
    let allowed = match allowed_columns(&headers) {
        Ok(allowed) => allowed,
        Err(error) => return error_response(error.into()),
    };
    let request = ReportRequest::new(report, &parsed.filters)
        .with_sort(parsed.sort)
        .with_allowed(allowed.as_deref());

    match service.preview_report(request) {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<S>(
    State(service): State<Arc<FormsReportService<S>>>,
    Path(report_type): Path<String>,
    Query(query): Query<FormsQuery>,
    headers: HeaderMap,
) -> Response
where
    S: SubmissionStore + 'static,
{
    let (report, parsed) = match parse_report_request(&report_type, &query) {
        Ok(parts) => parts,
        Err(error) => return error_response(error.into()),
    };
    let full_export = match query.full_export() {
        Ok(full) => full,
        Err(error) => return error_response(error.into()),
    };
    let allowed = match allowed_columns(&headers) {
        Ok(allowed) => allowed,
        Err(error) => return error_response(error.into()),
    };
    let request = ReportRequest::new(report, &parsed.filters)
        .with_sort(parsed.sort)
        .with_allowed(allowed.as_deref());

    match service.export_report(request, full_export) {
        Ok(file) => {
            let headers = [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ];
            (StatusCode::OK, headers, file.bytes).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn parse_report_request(
    report_type: &str,
    query: &FormsQuery,
) -> Result<(ReportType, super::forms::ParsedQuery), ValidationError> {
    let report = ReportType::parse(report_type)?;
    Ok((report, query.parse()?))
}
