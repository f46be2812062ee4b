use serde::Serialize;

pub const ALLOWED_PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Normalized page window. Only [`PageRequest::normalize`] and
/// [`PageRequest::new`] construct one, so both fields are always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Out-of-range input falls back to defaults instead of failing.
    pub fn normalize(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: normalize_page(page),
            page_size: normalize_page_size(page_size),
        }
    }

    /// Typed variant of `normalize`: page 0 becomes 1, sizes outside the
    /// allowed set become the default.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: if ALLOWED_PAGE_SIZES.contains(&page_size) {
                page_size
            } else {
                DEFAULT_PAGE_SIZE
            },
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

fn normalize_page(raw: Option<&str>) -> usize {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return 1;
    };
    match value.parse::<f64>() {
        Ok(page) if page.is_finite() && page >= 1.0 => {
            let page = page.floor();
            if page >= usize::MAX as f64 {
                usize::MAX
            } else {
                page as usize
            }
        }
        _ => 1,
    }
}

fn normalize_page_size(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|size| ALLOWED_PAGE_SIZES.contains(size))
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// Sort keys accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    SubmissionDate,
    CompanyName,
    CompanyCode,
    CompanyType,
    Country,
    ReportingFrom,
    ReportingTo,
    WomenPercent,
    MenPercent,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = match raw.trim() {
            "submissionDate" | "createdAt" | "submittedAt" => Self::SubmissionDate,
            "companyName" => Self::CompanyName,
            "companyCode" => Self::CompanyCode,
            "companyType" => Self::CompanyType,
            "country" => Self::Country,
            "reportingFrom" => Self::ReportingFrom,
            "reportingTo" => Self::ReportingTo,
            "womenPercent" => Self::WomenPercent,
            "menPercent" => Self::MenPercent,
            _ => return None,
        };
        Some(key)
    }

    /// Percentages are computed after the query, so they cannot be ordered
    /// physically and sort by submission time instead.
    pub const fn physical_column(self) -> SortColumn {
        match self {
            Self::SubmissionDate | Self::WomenPercent | Self::MenPercent => SortColumn::CreatedAt,
            Self::CompanyName => SortColumn::CompanyName,
            Self::CompanyCode => SortColumn::CompanyCode,
            Self::CompanyType => SortColumn::CompanyType,
            Self::Country => SortColumn::Country,
            Self::ReportingFrom => SortColumn::ReportingFrom,
            Self::ReportingTo => SortColumn::ReportingTo,
        }
    }
}

/// Columns the store can order by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    CreatedAt,
    CompanyName,
    CompanyCode,
    CompanyType,
    Country,
    ReportingFrom,
    ReportingTo,
}

impl SortColumn {
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::CompanyName => "company_name",
            Self::CompanyCode => "company_code",
            Self::CompanyType => "company_type",
            Self::Country => "country",
            Self::ReportingFrom => "reporting_from",
            Self::ReportingTo => "reporting_to",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Physical ordering handed to the store. No tie-break column is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub requested: SortKey,
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(SortKey::SubmissionDate, SortDirection::Desc)
    }
}

impl SortSpec {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self {
            requested: key,
            column: key.physical_column(),
            direction,
        }
    }

    /// Unknown keys sort by submission date, unknown directions descend.
    pub fn normalize(key: Option<&str>, direction: Option<&str>) -> Self {
        let key = key
            .and_then(SortKey::parse)
            .unwrap_or(SortKey::SubmissionDate);
        let direction = direction
            .and_then(SortDirection::parse)
            .unwrap_or_default();
        Self::new(key, direction)
    }

    pub fn order_by_sql(&self) -> String {
        format!(
            "ORDER BY {} {}",
            self.column.sql_name(),
            self.direction.sql_keyword()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_non_positive_and_non_finite_values() {
        for raw in ["0", "-5", "NaN", "inf", "abc", ""] {
            assert_eq!(PageRequest::normalize(Some(raw), None).page, 1, "{raw}");
        }
        assert_eq!(PageRequest::normalize(None, None).page, 1);
        assert_eq!(PageRequest::normalize(Some("3"), None).page, 3);
        assert_eq!(PageRequest::normalize(Some("2.7"), None).page, 2);
    }

    #[test]
    fn page_size_outside_allowed_set_falls_back() {
        assert_eq!(PageRequest::normalize(None, Some("37")).page_size, 25);
        assert_eq!(PageRequest::normalize(None, Some("-10")).page_size, 25);
        assert_eq!(PageRequest::normalize(None, None).page_size, 25);
        for size in ALLOWED_PAGE_SIZES {
            let raw = size.to_string();
            assert_eq!(PageRequest::normalize(None, Some(&raw)).page_size, size);
        }
    }

    #[test]
    fn offset_is_derived_from_page_and_size() {
        let request = PageRequest::normalize(Some("3"), Some("10"));
        assert_eq!(request.offset(), 20);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn typed_construction_is_clamped_like_query_input() {
        let request = PageRequest::new(0, 37);
        assert_eq!((request.page(), request.page_size()), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(4, 50);
        assert_eq!((request.page(), request.page_size()), (4, 50));
        assert_eq!(request.offset(), 150);
        assert_eq!(PageRequest::new(usize::MAX, 100).offset(), usize::MAX);
    }

    #[test]
    fn percentage_sort_keys_fall_back_to_creation_time() {
        let spec = SortSpec::normalize(Some("womenPercent"), Some("asc"));
        assert_eq!(spec.requested, SortKey::WomenPercent);
        assert_eq!(spec.column, SortColumn::CreatedAt);
        assert_eq!(spec.direction, SortDirection::Asc);
        assert_eq!(
            SortSpec::normalize(Some("menPercent"), None).column,
            SortColumn::CreatedAt
        );
    }

    #[test]
    fn unknown_sort_input_uses_defaults() {
        let spec = SortSpec::normalize(Some("favouriteColour"), Some("sideways"));
        assert_eq!(spec, SortSpec::default());
        assert_eq!(spec.order_by_sql(), "ORDER BY created_at DESC");
    }

    #[test]
    fn known_sort_keys_map_to_physical_columns() {
        let spec = SortSpec::normalize(Some("companyName"), Some("ASC"));
        assert_eq!(spec.order_by_sql(), "ORDER BY company_name ASC");
    }
}
