//! Compiles a [`FilterRequest`] into row predicates evaluable against the
//! submissions table and a post-aggregation marker that needs gender totals.

use super::aggregate::GenderTotals;
use super::domain::{CompanyType, Submission};
use super::filters::{DateBounds, DateRange, FilterRequest, GenderAlignment};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Write as _;

/// How a submission's reporting period is compared with the requested range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMatch {
    /// `reporting_from <= to AND reporting_to >= from`.
    #[default]
    Overlap,
    /// `reporting_from >= from AND reporting_to <= to`.
    Containment,
}

impl PeriodMatch {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "overlap" => Some(Self::Overlap),
            "containment" | "contained" => Some(Self::Containment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPredicate {
    /// Case-insensitive substring of company name or code. Stored lowercased.
    CompanyContains(String),
    CompanyTypeIs(CompanyType),
    CreatedAtOrAfter(DateTime<Utc>),
    CreatedAtOrBefore(DateTime<Utc>),
    ReportPeriodOverlaps(DateRange),
    ReportPeriodWithin(DateRange),
    RequirementsApplied(bool),
}

impl RowPredicate {
    pub fn matches(&self, submission: &Submission) -> bool {
        match self {
            Self::CompanyContains(needle) => {
                submission.company_name.to_lowercase().contains(needle.as_str())
                    || submission.company_code.to_lowercase().contains(needle.as_str())
            }
            Self::CompanyTypeIs(kind) => submission.company_type == *kind,
            Self::CreatedAtOrAfter(start) => submission.created_at >= *start,
            Self::CreatedAtOrBefore(end) => submission.created_at <= *end,
            Self::ReportPeriodOverlaps(range) => {
                submission.reporting_from <= range.to && submission.reporting_to >= range.from
            }
            Self::ReportPeriodWithin(range) => {
                submission.reporting_from >= range.from && submission.reporting_to <= range.to
            }
            Self::RequirementsApplied(applied) => submission.requirements_applied == *applied,
        }
    }

    fn write_sql(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        let mut bind = |value: SqlValue| {
            params.push(value);
            params.len()
        };
        // Writing into a String cannot fail.
        let _ = match self {
            Self::CompanyContains(needle) => {
                let n = bind(SqlValue::Text(format!("%{}%", escape_like(needle))));
                write!(
                    sql,
                    "(LOWER(company_name) LIKE ${n} ESCAPE '\\' OR LOWER(company_code) LIKE ${n} ESCAPE '\\')"
                )
            }
            Self::CompanyTypeIs(kind) => {
                let n = bind(SqlValue::Text(kind.code().to_string()));
                write!(sql, "company_type = ${n}")
            }
            Self::CreatedAtOrAfter(start) => {
                let n = bind(SqlValue::Timestamp(*start));
                write!(sql, "created_at >= ${n}")
            }
            Self::CreatedAtOrBefore(end) => {
                let n = bind(SqlValue::Timestamp(*end));
                write!(sql, "created_at <= ${n}")
            }
            Self::ReportPeriodOverlaps(range) => {
                let to = bind(SqlValue::Date(range.to));
                let from = bind(SqlValue::Date(range.from));
                write!(sql, "(reporting_from <= ${to} AND reporting_to >= ${from})")
            }
            Self::ReportPeriodWithin(range) => {
                let from = bind(SqlValue::Date(range.from));
                let to = bind(SqlValue::Date(range.to));
                write!(sql, "(reporting_from >= ${from} AND reporting_to <= ${to})")
            }
            Self::RequirementsApplied(applied) => {
                let n = bind(SqlValue::Bool(*applied));
                write!(sql, "requirements_applied = ${n}")
            }
        };
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Bind parameter for a rendered predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

/// Parameterised `WHERE` body using `$n` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<SqlValue>,
}

/// Ordered AND-list of row predicates. Empty means "every row".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPredicates {
    predicates: Vec<RowPredicate>,
}

impl RowPredicates {
    pub fn new(predicates: Vec<RowPredicate>) -> Self {
        Self { predicates }
    }

    pub fn push(&mut self, predicate: RowPredicate) {
        self.predicates.push(predicate);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowPredicate> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(submission))
    }

    pub fn to_sql(&self) -> SqlFilter {
        let mut params = Vec::new();
        if self.predicates.is_empty() {
            return SqlFilter {
                clause: "TRUE".to_string(),
                params,
            };
        }

        let mut clause = String::new();
        for (index, predicate) in self.predicates.iter().enumerate() {
            if index > 0 {
                clause.push_str(" AND ");
            }
            predicate.write_sql(&mut clause, &mut params);
        }
        SqlFilter { clause, params }
    }
}

/// Filter that can only run once gender totals are known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostAggregationPredicate {
    #[default]
    None,
    /// Women share outside the inclusive 33-67% band.
    Imbalance,
    Alignment(GenderAlignment),
}

impl PostAggregationPredicate {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn retains(&self, totals: &GenderTotals) -> bool {
        match self {
            Self::None => true,
            Self::Imbalance => !totals.meets_alignment(),
            Self::Alignment(GenderAlignment::Meets33) => totals.meets_alignment(),
            Self::Alignment(GenderAlignment::NotMeet33) => !totals.meets_alignment(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilters {
    pub row: RowPredicates,
    pub post: PostAggregationPredicate,
}

/// Alignment wins when both gender filters are supplied.
pub fn compile(request: &FilterRequest, period_match: PeriodMatch) -> CompiledFilters {
    let mut row = RowPredicates::default();

    if let Some(company) = &request.company {
        row.push(RowPredicate::CompanyContains(company.to_lowercase()));
    }
    if let Some(kind) = request.company_type {
        row.push(RowPredicate::CompanyTypeIs(kind));
    }
    if let Some(DateBounds { from, to }) = request.submission_date {
        if let Some(day) = from {
            row.push(RowPredicate::CreatedAtOrAfter(start_of_day(day)));
        }
        if let Some(day) = to {
            row.push(RowPredicate::CreatedAtOrBefore(end_of_day(day)));
        }
    }
    if let Some(range) = request.report_period {
        row.push(match period_match {
            PeriodMatch::Overlap => RowPredicate::ReportPeriodOverlaps(range),
            PeriodMatch::Containment => RowPredicate::ReportPeriodWithin(range),
        });
    }
    if let Some(applied) = request.requirements_applied {
        row.push(RowPredicate::RequirementsApplied(applied));
    }

    let post = match (request.gender_alignment, request.gender_imbalance) {
        (Some(alignment), _) => PostAggregationPredicate::Alignment(alignment),
        (None, Some(_)) => PostAggregationPredicate::Imbalance,
        (None, None) => PostAggregationPredicate::None,
    };

    CompiledFilters { row, post }
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default();
    Utc.from_utc_datetime(&day.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::forms::filters::GenderImbalance;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn submission(period: (NaiveDate, NaiveDate), created_at: &str) -> Submission {
        Submission {
            id: crate::reports::forms::domain::SubmissionId::new("s-1"),
            company_code: "300123456".to_string(),
            company_name: "Šiaurės Energija UAB".to_string(),
            company_type: CompanyType::StateOwned,
            country: "LT".to_string(),
            legal_form: "UAB".to_string(),
            address: "Vilnius".to_string(),
            registry: "Registrų centras".to_string(),
            e_delivery_address: None,
            reporting_from: period.0,
            reporting_to: period.1,
            contact_name: "Contact".to_string(),
            contact_email: "contact@example.com".to_string(),
            contact_phone: None,
            consent: true,
            consent_text: None,
            requirements_applied: true,
            requirements_link: None,
            notes: None,
            created_at: created_at.parse().expect("valid timestamp"),
        }
    }

    fn january() -> FilterRequest {
        FilterRequest {
            report_period: Some(DateRange {
                from: date(2025, 1, 1),
                to: date(2025, 1, 31),
            }),
            ..FilterRequest::default()
        }
    }

    #[test]
    fn company_match_is_case_insensitive_over_name_and_code() {
        let request = FilterRequest {
            company: Some("ŠIAURĖS".to_string()),
            ..FilterRequest::default()
        };
        let compiled = compile(&request, PeriodMatch::Overlap);
        let row = submission((date(2025, 1, 1), date(2025, 12, 31)), "2025-02-01T10:00:00Z");
        assert!(compiled.row.matches(&row));

        let by_code = compile(
            &FilterRequest {
                company: Some("0123".to_string()),
                ..FilterRequest::default()
            },
            PeriodMatch::Overlap,
        );
        assert!(by_code.row.matches(&row));
    }

    #[test]
    fn submission_date_bounds_cover_whole_days() {
        let request = FilterRequest {
            submission_date: Some(DateBounds {
                from: Some(date(2025, 2, 1)),
                to: Some(date(2025, 2, 1)),
            }),
            ..FilterRequest::default()
        };
        let compiled = compile(&request, PeriodMatch::Overlap);
        let period = (date(2025, 1, 1), date(2025, 12, 31));
        assert!(compiled.row.matches(&submission(period, "2025-02-01T00:00:00Z")));
        assert!(compiled.row.matches(&submission(period, "2025-02-01T23:59:59.999Z")));
        assert!(!compiled.row.matches(&submission(period, "2025-02-02T00:00:00Z")));
        assert!(!compiled.row.matches(&submission(period, "2025-01-31T23:59:59Z")));
    }

    #[test]
    fn overlap_includes_periods_straddling_the_range_start() {
        let compiled = compile(&january(), PeriodMatch::Overlap);
        let straddling = submission((date(2024, 12, 20), date(2025, 1, 10)), "2025-02-01T10:00:00Z");
        let inside = submission((date(2025, 1, 5), date(2025, 1, 20)), "2025-02-01T10:00:00Z");
        let after = submission((date(2025, 2, 1), date(2025, 2, 28)), "2025-03-01T10:00:00Z");
        assert!(compiled.row.matches(&straddling));
        assert!(compiled.row.matches(&inside));
        assert!(!compiled.row.matches(&after));
    }

    #[test]
    fn containment_excludes_periods_starting_before_the_range() {
        let compiled = compile(&january(), PeriodMatch::Containment);
        let straddling = submission((date(2024, 12, 20), date(2025, 1, 10)), "2025-02-01T10:00:00Z");
        let inside = submission((date(2025, 1, 5), date(2025, 1, 20)), "2025-02-01T10:00:00Z");
        assert!(!compiled.row.matches(&straddling));
        assert!(compiled.row.matches(&inside));
    }

    #[test]
    fn alignment_takes_precedence_over_imbalance() {
        let request = FilterRequest {
            gender_imbalance: Some(GenderImbalance::Outside33To67),
            gender_alignment: Some(GenderAlignment::Meets33),
            ..FilterRequest::default()
        };
        let compiled = compile(&request, PeriodMatch::Overlap);
        assert_eq!(
            compiled.post,
            PostAggregationPredicate::Alignment(GenderAlignment::Meets33)
        );
        assert!(compiled.row.is_empty());
    }

    #[test]
    fn post_predicates_select_by_alignment_band() {
        let aligned = GenderTotals {
            women: 10,
            men: 20,
            total: 30,
        };
        let skewed = GenderTotals {
            women: 5,
            men: 25,
            total: 30,
        };
        let meets = PostAggregationPredicate::Alignment(GenderAlignment::Meets33);
        let misses = PostAggregationPredicate::Alignment(GenderAlignment::NotMeet33);
        assert!(meets.retains(&aligned) && !meets.retains(&skewed));
        assert!(!misses.retains(&aligned) && misses.retains(&skewed));
        assert!(PostAggregationPredicate::Imbalance.retains(&skewed));
        assert!(!PostAggregationPredicate::None.is_active());
    }

    #[test]
    fn sql_rendering_binds_every_value_in_order() {
        let request = FilterRequest {
            company: Some("50%_Off".to_string()),
            company_type: Some(CompanyType::Listed),
            requirements_applied: Some(false),
            ..january()
        };
        let sql = compile(&request, PeriodMatch::Overlap).row.to_sql();
        assert_eq!(
            sql.clause,
            "(LOWER(company_name) LIKE $1 ESCAPE '\\' OR LOWER(company_code) LIKE $1 ESCAPE '\\') \
AND company_type = $2 AND (reporting_from <= $3 AND reporting_to >= $4) AND requirements_applied = $5"
        );
        assert_eq!(sql.params[0], SqlValue::Text("%50\\%\\_off%".to_string()));
        assert_eq!(sql.params[2], SqlValue::Date(date(2025, 1, 31)));
        assert_eq!(sql.params[4], SqlValue::Bool(false));
        assert_eq!(RowPredicates::default().to_sql().clause, "TRUE");
    }
}
