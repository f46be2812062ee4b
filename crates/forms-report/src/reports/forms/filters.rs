use super::domain::CompanyType;
use super::pagination::{PageRequest, SortSpec};
use crate::reports::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filter dimensions a report can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKey {
    Company,
    CompanyType,
    SubmissionDate,
    ReportPeriod,
    GenderImbalance,
    GenderAlignment,
    RequirementsApplied,
}

impl FilterKey {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::CompanyType => "companyType",
            Self::SubmissionDate => "submissionDate",
            Self::ReportPeriod => "reportPeriod",
            Self::GenderImbalance => "genderImbalance",
            Self::GenderAlignment => "genderAlignment",
            Self::RequirementsApplied => "requirementsApplied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenderImbalance {
    #[serde(rename = "outside_33_67")]
    Outside33To67,
}

impl GenderImbalance {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Outside33To67 => "outside_33_67",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenderAlignment {
    #[serde(rename = "meets_33")]
    Meets33,
    #[serde(rename = "not_meet_33")]
    NotMeet33,
}

impl GenderAlignment {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Meets33 => "meets_33",
            Self::NotMeet33 => "not_meet_33",
        }
    }
}

/// Submission-date window; each bound applies on its own when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Closed calendar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// A single supplied bound is used for both ends.
    pub fn from_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Self> {
        match (from, to) {
            (Some(from), Some(to)) => Some(Self { from, to }),
            (Some(day), None) | (None, Some(day)) => Some(Self { from: day, to: day }),
            (None, None) => None,
        }
    }
}

/// Typed filter request for the forms report engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    pub company: Option<String>,
    pub company_type: Option<CompanyType>,
    pub submission_date: Option<DateBounds>,
    pub report_period: Option<DateRange>,
    pub gender_imbalance: Option<GenderImbalance>,
    pub gender_alignment: Option<GenderAlignment>,
    pub requirements_applied: Option<bool>,
}

impl FilterRequest {
    pub fn active_keys(&self) -> Vec<FilterKey> {
        let mut keys = Vec::new();
        if self.company.is_some() {
            keys.push(FilterKey::Company);
        }
        if self.company_type.is_some() {
            keys.push(FilterKey::CompanyType);
        }
        if self.submission_date.is_some() {
            keys.push(FilterKey::SubmissionDate);
        }
        if self.report_period.is_some() {
            keys.push(FilterKey::ReportPeriod);
        }
        if self.gender_imbalance.is_some() {
            keys.push(FilterKey::GenderImbalance);
        }
        if self.gender_alignment.is_some() {
            keys.push(FilterKey::GenderAlignment);
        }
        if self.requirements_applied.is_some() {
            keys.push(FilterKey::RequirementsApplied);
        }
        keys
    }

    /// Compact `key:value|key:value` rendering for export metadata.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(company) = &self.company {
            parts.push(format!("company:{company}"));
        }
        if let Some(kind) = self.company_type {
            parts.push(format!("companyType:{}", kind.code()));
        }
        if let Some(bounds) = self.submission_date {
            parts.push(format!(
                "submissionDate:{}..{}",
                bounds.from.map(|day| day.to_string()).unwrap_or_default(),
                bounds.to.map(|day| day.to_string()).unwrap_or_default()
            ));
        }
        if let Some(range) = self.report_period {
            parts.push(format!("reportPeriod:{}..{}", range.from, range.to));
        }
        if let Some(imbalance) = self.gender_imbalance {
            parts.push(format!("genderImbalance:{}", imbalance.code()));
        }
        if let Some(alignment) = self.gender_alignment {
            parts.push(format!("genderAlignment:{}", alignment.code()));
        }
        if let Some(applied) = self.requirements_applied {
            parts.push(format!(
                "requirementsApplied:{}",
                if applied { "yes" } else { "no" }
            ));
        }
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join("|")
        }
    }
}

/// Query string accepted by the admin forms and report endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormsQuery {
    pub company: Option<String>,
    pub company_type: Option<String>,
    pub submission_date_from: Option<String>,
    pub submission_date_to: Option<String>,
    pub report_from: Option<String>,
    pub report_to: Option<String>,
    pub gender_imbalance: Option<String>,
    pub gender_alignment: Option<String>,
    pub requirements_applied: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub filters: FilterRequest,
    pub sort: SortSpec,
    pub page: PageRequest,
}

impl FormsQuery {
    pub fn parse(&self) -> Result<ParsedQuery, ValidationError> {
        Ok(ParsedQuery {
            filters: self.filters()?,
            sort: SortSpec::normalize(present(&self.sort_by), present(&self.sort_dir)),
            page: PageRequest::normalize(present(&self.page), present(&self.page_size)),
        })
    }

    pub fn filters(&self) -> Result<FilterRequest, ValidationError> {
        let company = present(&self.company).map(str::to_string);

        let company_type = present(&self.company_type)
            .map(|raw| {
                CompanyType::parse(raw).ok_or_else(|| {
                    ValidationError::new("companyType", format!("unsupported company type '{raw}'"))
                })
            })
            .transpose()?;

        let submission_from = parse_optional_date("submissionDateFrom", &self.submission_date_from)?;
        let submission_to = parse_optional_date("submissionDateTo", &self.submission_date_to)?;
        ensure_ordered("submissionDate", submission_from, submission_to)?;
        let submission_date = if submission_from.is_some() || submission_to.is_some() {
            Some(DateBounds {
                from: submission_from,
                to: submission_to,
            })
        } else {
            None
        };

        let report_from = parse_optional_date("reportFrom", &self.report_from)?;
        let report_to = parse_optional_date("reportTo", &self.report_to)?;
        ensure_ordered("reportPeriod", report_from, report_to)?;
        let report_period = DateRange::from_bounds(report_from, report_to);

        let gender_imbalance = present(&self.gender_imbalance)
            .map(|raw| match raw {
                "outside_33_67" => Ok(GenderImbalance::Outside33To67),
                other => Err(ValidationError::new(
                    "genderImbalance",
                    format!("expected 'outside_33_67', got '{other}'"),
                )),
            })
            .transpose()?;

        let gender_alignment = present(&self.gender_alignment)
            .map(|raw| match raw {
                "meets_33" => Ok(GenderAlignment::Meets33),
                "not_meet_33" => Ok(GenderAlignment::NotMeet33),
                other => Err(ValidationError::new(
                    "genderAlignment",
                    format!("expected 'meets_33' or 'not_meet_33', got '{other}'"),
                )),
            })
            .transpose()?;

        let requirements_applied = present(&self.requirements_applied)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "yes" => Ok(true),
                "no" => Ok(false),
                other => Err(ValidationError::new(
                    "requirementsApplied",
                    format!("expected 'yes' or 'no', got '{other}'"),
                )),
            })
            .transpose()?;

        Ok(FilterRequest {
            company,
            company_type,
            submission_date,
            report_period,
            gender_imbalance,
            gender_alignment,
            requirements_applied,
        })
    }

    pub fn full_export(&self) -> Result<bool, ValidationError> {
        match present(&self.full).map(str::to_ascii_lowercase).as_deref() {
            None | Some("false") | Some("0") => Ok(false),
            Some("true") | Some("1") => Ok(true),
            Some(other) => Err(ValidationError::new(
                "full",
                format!("expected a boolean, got '{other}'"),
            )),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn parse_optional_date(
    field: &str,
    value: &Option<String>,
) -> Result<Option<NaiveDate>, ValidationError> {
    present(value)
        .map(|raw| parse_date(raw).map_err(|message| ValidationError::new(field, message)))
        .transpose()
}

fn ensure_ordered(
    field: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::new(
            field,
            format!("range start {from} is after range end {to}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::forms::pagination::SortKey;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn blank_values_are_treated_as_absent() {
        let query = FormsQuery {
            company: Some("   ".to_string()),
            company_type: Some(String::new()),
            report_from: Some(String::new()),
            ..FormsQuery::default()
        };
        let parsed = query.parse().expect("parses");
        assert_eq!(parsed.filters, FilterRequest::default());
        assert!(parsed.filters.active_keys().is_empty());
    }

    #[test]
    fn single_report_bound_is_used_for_both_ends() {
        let query = FormsQuery {
            report_to: Some("2025-03-31".to_string()),
            ..FormsQuery::default()
        };
        let filters = query.filters().expect("parses");
        assert_eq!(
            filters.report_period,
            Some(DateRange {
                from: date(2025, 3, 31),
                to: date(2025, 3, 31)
            })
        );
    }

    #[test]
    fn submission_bounds_stay_independent() {
        let query = FormsQuery {
            submission_date_from: Some("2025-01-01".to_string()),
            ..FormsQuery::default()
        };
        let filters = query.filters().expect("parses");
        assert_eq!(
            filters.submission_date,
            Some(DateBounds {
                from: Some(date(2025, 1, 1)),
                to: None
            })
        );
    }

    #[test]
    fn malformed_values_surface_the_offending_field() {
        let query = FormsQuery {
            gender_alignment: Some("half".to_string()),
            ..FormsQuery::default()
        };
        let error = query.filters().expect_err("rejects alignment");
        assert_eq!(error.field, "genderAlignment");

        let query = FormsQuery {
            submission_date_to: Some("31/01/2025".to_string()),
            ..FormsQuery::default()
        };
        let error = query.filters().expect_err("rejects date");
        assert_eq!(error.field, "submissionDateTo");
        assert!(error.to_string().contains("YYYY-MM-DD"));

        let query = FormsQuery {
            company_type: Some("bank".to_string()),
            ..FormsQuery::default()
        };
        assert_eq!(query.filters().expect_err("rejects type").field, "companyType");
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let query = FormsQuery {
            report_from: Some("2025-02-01".to_string()),
            report_to: Some("2025-01-01".to_string()),
            ..FormsQuery::default()
        };
        assert_eq!(query.filters().expect_err("inverted").field, "reportPeriod");
    }

    #[test]
    fn parse_combines_filters_sort_and_page() {
        let query = FormsQuery {
            company: Some("Acme".to_string()),
            requirements_applied: Some("YES".to_string()),
            gender_imbalance: Some("outside_33_67".to_string()),
            page: Some("0".to_string()),
            page_size: Some("37".to_string()),
            sort_by: Some("companyName".to_string()),
            sort_dir: Some("asc".to_string()),
            ..FormsQuery::default()
        };
        let parsed = query.parse().expect("parses");
        assert_eq!(parsed.filters.company.as_deref(), Some("Acme"));
        assert_eq!(parsed.filters.requirements_applied, Some(true));
        assert_eq!(
            parsed.filters.gender_imbalance,
            Some(GenderImbalance::Outside33To67)
        );
        assert_eq!(parsed.page, PageRequest::default());
        assert_eq!(parsed.sort.requested, SortKey::CompanyName);
        assert_eq!(
            parsed.filters.summary(),
            "company:Acme|genderImbalance:outside_33_67|requirementsApplied:yes"
        );
    }

    #[test]
    fn full_export_flag_accepts_booleans() {
        let mut query = FormsQuery::default();
        assert!(!query.full_export().expect("absent"));
        query.full = Some("TRUE".to_string());
        assert!(query.full_export().expect("true"));
        query.full = Some("maybe".to_string());
        assert!(query.full_export().is_err());
    }
}
