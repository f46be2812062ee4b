use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a stored submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyType {
    Listed,
    StateOwned,
    MunicipalityOwned,
    Other,
}

impl CompanyType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Listed,
            Self::StateOwned,
            Self::MunicipalityOwned,
            Self::Other,
        ]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Listed => "LISTED",
            Self::StateOwned => "STATE_OWNED",
            Self::MunicipalityOwned => "MUNICIPALITY_OWNED",
            Self::Other => "OTHER",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Listed => "Listed company",
            Self::StateOwned => "State-owned enterprise",
            Self::MunicipalityOwned => "Municipality-owned enterprise",
            Self::Other => "Other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|kind| kind.code() == normalized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenderRole {
    Ceo,
    Board,
    SupervisoryBoard,
}

impl GenderRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ceo => "CEO",
            Self::Board => "Board",
            Self::SupervisoryBoard => "Supervisory board",
        }
    }
}

/// Per-role head count attached to a submission.
///
/// `total == women + men` holds at write time only; readers must not rely on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderBalanceRow {
    pub role: GenderRole,
    pub women: u32,
    pub men: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOrgan {
    pub organ_type: String,
    pub name: String,
    #[serde(default)]
    pub members: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeasure {
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
    pub locale: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Company snapshot and reporting data captured at intake time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub company_code: String,
    pub company_name: String,
    pub company_type: CompanyType,
    pub country: String,
    pub legal_form: String,
    pub address: String,
    pub registry: String,
    pub e_delivery_address: Option<String>,
    pub reporting_from: NaiveDate,
    pub reporting_to: NaiveDate,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub consent: bool,
    pub consent_text: Option<String>,
    pub requirements_applied: bool,
    pub requirements_link: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Child collections hydrated for detail views and full exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionChildren {
    #[serde(default)]
    pub gender_balance: Vec<GenderBalanceRow>,
    #[serde(default)]
    pub organs: Vec<SubmissionOrgan>,
    #[serde(default)]
    pub measures: Vec<SubmissionMeasure>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub meta: Option<SubmissionMeta>,
}

/// A submission together with everything created alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub submission: Submission,
    #[serde(flatten)]
    pub children: SubmissionChildren,
}
