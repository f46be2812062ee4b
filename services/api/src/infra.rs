use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use forms_report::error::AppError;
use forms_report::reports::forms::domain::{
    Attachment, CompanyType, GenderBalanceRow, GenderRole, Submission, SubmissionChildren,
    SubmissionId, SubmissionMeasure, SubmissionMeta, SubmissionOrgan, SubmissionRecord,
};
use forms_report::reports::forms::InMemorySubmissionStore;
use forms_report::reports::{ReportError, ReportType};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reads a JSON array of submission records (children inline).
pub(crate) fn load_seed(path: &Path) -> Result<Vec<SubmissionRecord>, AppError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Seed file when given, otherwise the demo data set unless `demo` is off.
pub(crate) fn build_store(
    seed: Option<&Path>,
    demo: bool,
) -> Result<InMemorySubmissionStore, AppError> {
    let records = match seed {
        Some(path) => load_seed(path)?,
        None if demo => demo_records(),
        None => Vec::new(),
    };
    InMemorySubmissionStore::from_records(records)
        .map_err(|err| AppError::from(ReportError::from(err)))
}

pub(crate) fn parse_report_type(raw: &str) -> Result<ReportType, String> {
    ReportType::parse(raw).map_err(|err| err.message)
}

fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn balance(ceo: (u32, u32), board: (u32, u32)) -> Vec<GenderBalanceRow> {
    [(GenderRole::Ceo, ceo), (GenderRole::Board, board)]
        .into_iter()
        .map(|(role, (women, men))| GenderBalanceRow {
            role,
            women,
            men,
            total: women + men,
        })
        .collect()
}

struct DemoCompany {
    code: &'static str,
    name: &'static str,
    kind: CompanyType,
    legal_form: &'static str,
}

const DEMO_COMPANIES: [DemoCompany; 5] = [
    DemoCompany {
        code: "300100200",
        name: "Baltic Grid",
        kind: CompanyType::StateOwned,
        legal_form: "AB",
    },
    DemoCompany {
        code: "110220330",
        name: "Nordic Rail Holdings",
        kind: CompanyType::Listed,
        legal_form: "AB",
    },
    DemoCompany {
        code: "124578963",
        name: "Vilnius Water",
        kind: CompanyType::MunicipalityOwned,
        legal_form: "UAB",
    },
    DemoCompany {
        code: "302211987",
        name: "Amber Logistics",
        kind: CompanyType::Other,
        legal_form: "UAB",
    },
    DemoCompany {
        code: "111000222",
        name: "Harbour Energy, Klaipėda",
        kind: CompanyType::StateOwned,
        legal_form: "AB",
    },
];

/// Small fixed data set for local runs and demos.
pub(crate) fn demo_records() -> Vec<SubmissionRecord> {
    let plan: [(usize, DateTime<Utc>, (NaiveDate, NaiveDate), Vec<GenderBalanceRow>, bool); 8] = [
        (0, at(2025, 1, 14, 9), (date(2024, 1, 1), date(2024, 12, 31)), balance((0, 1), (3, 4)), true),
        (1, at(2025, 1, 30, 11), (date(2024, 1, 1), date(2024, 12, 31)), balance((0, 1), (1, 6)), false),
        (2, at(2025, 2, 11, 15), (date(2024, 7, 1), date(2025, 6, 30)), balance((1, 0), (2, 2)), true),
        (3, at(2025, 2, 27, 8), (date(2024, 1, 1), date(2024, 12, 31)), Vec::new(), false),
        (4, at(2025, 3, 5, 13), (date(2024, 1, 1), date(2024, 12, 31)), balance((0, 1), (2, 5)), false),
        (1, at(2025, 3, 18, 10), (date(2025, 1, 1), date(2025, 3, 31)), balance((1, 0), (3, 4)), true),
        (0, at(2025, 4, 2, 16), (date(2025, 1, 1), date(2025, 3, 31)), balance((1, 0), (4, 3)), true),
        (3, at(2025, 4, 22, 12), (date(2023, 1, 1), date(2023, 12, 31)), balance((0, 1), (0, 3)), false),
    ];

    plan.into_iter()
        .enumerate()
        .map(|(index, (company, created_at, (from, to), gender_balance, applied))| {
            let company = &DEMO_COMPANIES[company];
            let id = format!("demo-{:02}", index + 1);
            let attachments = if applied {
                vec![Attachment {
                    file_name: "equality-policy.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    size_bytes: 48_213,
                    storage_key: format!("forms/{id}/equality-policy.pdf"),
                }]
            } else {
                Vec::new()
            };
            SubmissionRecord {
                submission: Submission {
                    id: SubmissionId::new(id.clone()),
                    company_code: company.code.to_string(),
                    company_name: company.name.to_string(),
                    company_type: company.kind,
                    country: "LT".to_string(),
                    legal_form: company.legal_form.to_string(),
                    address: format!("{} g. {}, Vilnius", company.name, index + 3),
                    registry: "Register of Legal Entities".to_string(),
                    e_delivery_address: Some(format!("{}@edelivery.example", company.code)),
                    reporting_from: from,
                    reporting_to: to,
                    contact_name: "Compliance Officer".to_string(),
                    contact_email: format!("compliance+{}@example.com", company.code),
                    contact_phone: None,
                    consent: true,
                    consent_text: Some("Data is accurate to the best of my knowledge.".to_string()),
                    requirements_applied: applied,
                    requirements_link: applied
                        .then(|| format!("https://example.com/{}/equality", company.code)),
                    notes: None,
                    created_at,
                },
                children: SubmissionChildren {
                    gender_balance,
                    organs: vec![SubmissionOrgan {
                        organ_type: "BOARD".to_string(),
                        name: "Management board".to_string(),
                        members: 7,
                    }],
                    measures: applied
                        .then(|| SubmissionMeasure {
                            kind: "TARGET".to_string(),
                            description: "Balanced shortlist for board vacancies".to_string(),
                        })
                        .into_iter()
                        .collect(),
                    attachments,
                    meta: Some(SubmissionMeta {
                        locale: "lt".to_string(),
                        user_agent: None,
                        source: Some("demo".to_string()),
                    }),
                },
            }
        })
        .collect()
}
