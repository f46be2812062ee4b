use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::aggregate::GenderTotals;
use super::domain::{
    Attachment, CompanyType, GenderBalanceRow, Submission, SubmissionChildren, SubmissionId,
    SubmissionMeasure, SubmissionMeta, SubmissionOrgan,
};
use crate::reports::export::ReportRow;
use crate::reports::registry::{ColumnDef, ReportType};

pub(crate) fn iso_date(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub(crate) fn iso_datetime(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One row of the admin forms list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormListItem {
    pub id: SubmissionId,
    pub company_code: String,
    pub company_name: String,
    pub company_type: CompanyType,
    pub country: String,
    pub legal_form: String,
    pub reporting_from: String,
    pub reporting_to: String,
    pub submitted_at: String,
    pub contact_name: String,
    pub contact_email: String,
    pub requirements_applied: bool,
    pub requirements_link: Option<String>,
    pub women_percent: u8,
    pub men_percent: u8,
    pub totals_women: u64,
    pub totals_men: u64,
    pub totals_total: u64,
}

impl FormListItem {
    pub fn project(submission: &Submission, totals: GenderTotals) -> Self {
        let percentages = totals.percentages();
        Self {
            id: submission.id.clone(),
            company_code: submission.company_code.clone(),
            company_name: submission.company_name.clone(),
            company_type: submission.company_type,
            country: submission.country.clone(),
            legal_form: submission.legal_form.clone(),
            reporting_from: iso_date(submission.reporting_from),
            reporting_to: iso_date(submission.reporting_to),
            submitted_at: iso_datetime(submission.created_at),
            contact_name: submission.contact_name.clone(),
            contact_email: submission.contact_email.clone(),
            requirements_applied: submission.requirements_applied,
            requirements_link: submission.requirements_link.clone(),
            women_percent: percentages.women_percent,
            men_percent: percentages.men_percent,
            totals_women: totals.women,
            totals_men: totals.men,
            totals_total: totals.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormListPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub items: Vec<FormListItem>,
}

/// Single submission with every child collection hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDetails {
    #[serde(flatten)]
    pub summary: FormListItem,
    pub address: String,
    pub registry: String,
    pub e_delivery_address: Option<String>,
    pub contact_phone: Option<String>,
    pub consent: bool,
    pub consent_text: Option<String>,
    pub notes: Option<String>,
    pub gender_balance: Vec<GenderBalanceRow>,
    pub organs: Vec<SubmissionOrgan>,
    pub measures: Vec<SubmissionMeasure>,
    pub attachments: Vec<Attachment>,
    pub meta: Option<SubmissionMeta>,
}

impl FormDetails {
    pub fn new(submission: Submission, children: SubmissionChildren) -> Self {
        let totals = GenderTotals::from_rows(&children.gender_balance);
        Self {
            summary: FormListItem::project(&submission, totals),
            address: submission.address,
            registry: submission.registry,
            e_delivery_address: submission.e_delivery_address,
            contact_phone: submission.contact_phone,
            consent: submission.consent,
            consent_text: submission.consent_text,
            notes: submission.notes,
            gender_balance: children.gender_balance,
            organs: children.organs,
            measures: children.measures,
            attachments: children.attachments,
            meta: children.meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPreview {
    pub report: ReportType,
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<ReportRow>,
    pub total: usize,
}

/// Rendered CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub report: ReportType,
    pub file_name: String,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

fn put(row: &mut ReportRow, key: &str, value: impl Into<Value>) {
    row.insert(key.to_string(), value.into());
}

/// Every forms-list cell the registry knows about; callers narrow it.
pub(crate) fn form_row(
    submission: &Submission,
    totals: GenderTotals,
    children: Option<&SubmissionChildren>,
) -> Result<ReportRow, serde_json::Error> {
    let item = FormListItem::project(submission, totals);
    let mut row = ReportRow::new();
    put(&mut row, "id", item.id.0);
    put(&mut row, "companyCode", item.company_code);
    put(&mut row, "companyName", item.company_name);
    put(&mut row, "companyType", submission.company_type.code());
    put(&mut row, "country", item.country);
    put(&mut row, "reportingFrom", item.reporting_from);
    put(&mut row, "reportingTo", item.reporting_to);
    put(&mut row, "submittedAt", item.submitted_at);
    put(&mut row, "womenPercent", item.women_percent);
    put(&mut row, "menPercent", item.men_percent);
    put(&mut row, "requirementsApplied", item.requirements_applied);
    put(&mut row, "legalForm", item.legal_form);
    put(&mut row, "address", submission.address.clone());
    put(&mut row, "registry", submission.registry.clone());
    put(&mut row, "eDeliveryAddress", submission.e_delivery_address.clone());
    put(&mut row, "contactName", item.contact_name);
    put(&mut row, "contactEmail", item.contact_email);
    put(&mut row, "contactPhone", submission.contact_phone.clone());
    put(&mut row, "consent", submission.consent);
    put(&mut row, "consentText", submission.consent_text.clone());
    put(&mut row, "requirementsLink", item.requirements_link);
    put(&mut row, "notes", submission.notes.clone());
    put(&mut row, "totalsWomen", item.totals_women);
    put(&mut row, "totalsMen", item.totals_men);
    put(&mut row, "totalsTotal", item.totals_total);

    if let Some(children) = children {
        put(&mut row, "genderBalance", serde_json::to_value(&children.gender_balance)?);
        put(&mut row, "organs", serde_json::to_value(&children.organs)?);
        put(&mut row, "measures", serde_json::to_value(&children.measures)?);
        put(&mut row, "attachments", serde_json::to_value(&children.attachments)?);
        put(&mut row, "meta", serde_json::to_value(&children.meta)?);
    }
    Ok(row)
}

/// Submissions of one company folded into a single row.
#[derive(Debug, Clone)]
pub(crate) struct CompanyRollup<'a> {
    pub latest: &'a Submission,
    pub latest_totals: GenderTotals,
    pub submissions: usize,
}

impl CompanyRollup<'_> {
    pub fn to_row(&self) -> ReportRow {
        let latest = self.latest;
        let percentages = self.latest_totals.percentages();
        let mut row = ReportRow::new();
        put(&mut row, "companyCode", latest.company_code.clone());
        put(&mut row, "companyName", latest.company_name.clone());
        put(&mut row, "companyType", latest.company_type.code());
        put(&mut row, "country", latest.country.clone());
        put(&mut row, "submissions", self.submissions as u64);
        put(&mut row, "lastSubmittedAt", iso_datetime(latest.created_at));
        put(&mut row, "womenPercent", percentages.women_percent);
        put(&mut row, "menPercent", percentages.men_percent);
        put(&mut row, "legalForm", latest.legal_form.clone());
        put(&mut row, "address", latest.address.clone());
        put(&mut row, "registry", latest.registry.clone());
        put(&mut row, "eDeliveryAddress", latest.e_delivery_address.clone());
        put(&mut row, "latestReportingFrom", iso_date(latest.reporting_from));
        put(&mut row, "latestReportingTo", iso_date(latest.reporting_to));
        row
    }
}

/// Keeps only `columns`, in column order. Anything else is dropped.
pub(crate) fn restrict_row(mut row: ReportRow, columns: &[ColumnDef]) -> ReportRow {
    columns
        .iter()
        .filter_map(|column| {
            row.remove(column.key)
                .map(|value| (column.key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn datetime_format_is_iso_with_millis() {
        let at = Utc
            .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("valid instant");
        assert_eq!(iso_datetime(at), "2025-01-02T03:04:05.000Z");
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).expect("valid date");
        assert_eq!(iso_date(day), "2025-03-09");
    }

    #[test]
    fn restrict_row_drops_unlisted_keys() {
        let mut row = ReportRow::new();
        put(&mut row, "id", "a");
        put(&mut row, "secret", "hidden");
        put(&mut row, "womenPercent", 40u8);
        let columns = [
            ColumnDef {
                key: "womenPercent",
                label: "Women %",
            },
            ColumnDef {
                key: "id",
                label: "ID",
            },
        ];
        let restricted = restrict_row(row, &columns);
        assert_eq!(restricted.len(), 2);
        assert!(!restricted.contains_key("secret"));

        let keys: Vec<&str> = restricted.keys().map(String::as_str).collect();
        assert_eq!(keys, ["womenPercent", "id"]);
        assert_eq!(
            serde_json::to_string(&restricted).expect("serializes"),
            r#"{"womenPercent":40,"id":"a"}"#
        );
    }
}
