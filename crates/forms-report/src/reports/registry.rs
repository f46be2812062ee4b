use super::error::ValidationError;
use super::forms::domain::CompanyType;
use super::forms::filters::{FilterKey, FilterRequest};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportType {
    #[serde(rename = "companies-list")]
    CompaniesList,
    #[serde(rename = "forms-list")]
    FormsList,
}

impl ReportType {
    pub const fn ordered() -> [Self; 2] {
        [Self::CompaniesList, Self::FormsList]
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::CompaniesList => "companies-list",
            Self::FormsList => "forms-list",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.id() == trimmed)
            .ok_or_else(|| {
                ValidationError::new("reportType", format!("unknown report type '{trimmed}'"))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub key: &'static str,
    pub label: &'static str,
}

const fn column(key: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef { key, label }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    Text,
    Select { options: Vec<&'static str> },
    DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDef {
    pub key: FilterKey,
    #[serde(flatten)]
    pub kind: FilterKind,
}

/// Static description of one report: visible columns, the extended export
/// column set and the filters it accepts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    pub id: ReportType,
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
    pub export_columns: Vec<ColumnDef>,
    pub filters: Vec<FilterDef>,
}

impl ReportDefinition {
    pub fn accepts(&self, key: FilterKey) -> bool {
        self.filters.iter().any(|filter| filter.key == key)
    }

    pub fn ensure_filters_supported(&self, request: &FilterRequest) -> Result<(), ValidationError> {
        match request
            .active_keys()
            .into_iter()
            .find(|key| !self.accepts(*key))
        {
            Some(key) => Err(ValidationError::new(
                key.key(),
                format!("filter is not supported by report '{}'", self.id.id()),
            )),
            None => Ok(()),
        }
    }

    /// Registry columns for the mode, narrowed to `allowed` when given.
    pub fn visible_columns(&self, full_export: bool, allowed: Option<&[String]>) -> Vec<ColumnDef> {
        let source = if full_export {
            &self.export_columns
        } else {
            &self.columns
        };
        source
            .iter()
            .filter(|column| {
                allowed.map_or(true, |keys| keys.iter().any(|key| key == column.key))
            })
            .copied()
            .collect()
    }
}

/// Immutable catalogue built once at start-up and shared by reference.
#[derive(Debug, Clone)]
pub struct ReportRegistry {
    definitions: Vec<ReportDefinition>,
}

impl ReportRegistry {
    pub fn standard() -> Self {
        Self {
            definitions: vec![companies_list(), forms_list()],
        }
    }

    pub fn definitions(&self) -> &[ReportDefinition] {
        &self.definitions
    }

    pub fn get(&self, report: ReportType) -> Option<&ReportDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.id == report)
    }

    pub fn definition(&self, report: ReportType) -> Result<&ReportDefinition, ValidationError> {
        self.get(report).ok_or_else(|| {
            ValidationError::new("reportType", format!("report '{}' is not registered", report.id()))
        })
    }
}

impl Default for ReportRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn company_filters() -> Vec<FilterDef> {
    vec![
        FilterDef {
            key: FilterKey::Company,
            kind: FilterKind::Text,
        },
        FilterDef {
            key: FilterKey::CompanyType,
            kind: FilterKind::Select {
                options: CompanyType::ordered()
                    .into_iter()
                    .map(CompanyType::code)
                    .collect(),
            },
        },
        FilterDef {
            key: FilterKey::SubmissionDate,
            kind: FilterKind::DateRange,
        },
        FilterDef {
            key: FilterKey::ReportPeriod,
            kind: FilterKind::DateRange,
        },
    ]
}

fn companies_list() -> ReportDefinition {
    let columns = vec![
        column("companyCode", "Company code"),
        column("companyName", "Company name"),
        column("companyType", "Company type"),
        column("country", "Country"),
        column("submissions", "Submissions"),
        column("lastSubmittedAt", "Last submitted at"),
        column("womenPercent", "Women %"),
        column("menPercent", "Men %"),
    ];
    let mut export_columns = columns.clone();
    export_columns.extend([
        column("legalForm", "Legal form"),
        column("address", "Address"),
        column("registry", "Registry"),
        column("eDeliveryAddress", "E-delivery address"),
        column("latestReportingFrom", "Latest reporting from"),
        column("latestReportingTo", "Latest reporting to"),
    ]);

    ReportDefinition {
        id: ReportType::CompaniesList,
        name: "Companies",
        columns,
        export_columns,
        filters: company_filters(),
    }
}

fn forms_list() -> ReportDefinition {
    let columns = vec![
        column("id", "Submission ID"),
        column("companyCode", "Company code"),
        column("companyName", "Company name"),
        column("companyType", "Company type"),
        column("country", "Country"),
        column("reportingFrom", "Reporting from"),
        column("reportingTo", "Reporting to"),
        column("submittedAt", "Submitted at"),
        column("womenPercent", "Women %"),
        column("menPercent", "Men %"),
        column("requirementsApplied", "Requirements applied"),
    ];
    let mut export_columns = columns.clone();
    export_columns.extend([
        column("legalForm", "Legal form"),
        column("address", "Address"),
        column("registry", "Registry"),
        column("eDeliveryAddress", "E-delivery address"),
        column("contactName", "Contact name"),
        column("contactEmail", "Contact email"),
        column("contactPhone", "Contact phone"),
        column("consent", "Consent"),
        column("consentText", "Consent text"),
        column("requirementsLink", "Requirements link"),
        column("notes", "Notes"),
        column("totalsWomen", "Women (total)"),
        column("totalsMen", "Men (total)"),
        column("totalsTotal", "Total"),
        column("genderBalance", "Gender balance"),
        column("organs", "Organs"),
        column("measures", "Measures"),
        column("attachments", "Attachments"),
        column("meta", "Meta"),
    ]);

    let mut filters = company_filters();
    filters.extend([
        FilterDef {
            key: FilterKey::GenderImbalance,
            kind: FilterKind::Select {
                options: vec!["outside_33_67"],
            },
        },
        FilterDef {
            key: FilterKey::GenderAlignment,
            kind: FilterKind::Select {
                options: vec!["meets_33", "not_meet_33"],
            },
        },
        FilterDef {
            key: FilterKey::RequirementsApplied,
            kind: FilterKind::Select {
                options: vec!["yes", "no"],
            },
        },
    ]);

    ReportDefinition {
        id: ReportType::FormsList,
        name: "Submitted forms",
        columns,
        export_columns,
        filters,
    }
}
