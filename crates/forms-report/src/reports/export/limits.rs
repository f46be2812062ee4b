use serde::Serialize;
use std::fmt;

pub const MAX_EXPORT_ROWS: usize = 50_000;
pub const MAX_EXPORT_BYTES: u64 = 25 * 1024 * 1024;
pub const PREVIEW_ROWS: usize = 500;
pub const DEFAULT_AVG_CELL_LEN: u64 = 12;
/// Rough size of the `# key=value; ...` preamble line.
pub const METADATA_ESTIMATE_BYTES: u64 = 40;
const BOM_BYTES: u64 = 3;

/// Hard caps applied before any export rows are materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLimits {
    pub max_rows: usize,
    pub max_bytes: u64,
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            max_rows: MAX_EXPORT_ROWS,
            max_bytes: MAX_EXPORT_BYTES,
        }
    }
}

impl ExportLimits {
    /// Rows are checked before bytes; the first breach is reported.
    pub fn check(&self, rows: usize, estimated_bytes: u64) -> Result<(), ExportLimitExceeded> {
        if rows > self.max_rows {
            return Err(ExportLimitExceeded {
                limit: ExportLimit::Rows,
                value: rows as u64,
                max: self.max_rows as u64,
            });
        }
        if estimated_bytes > self.max_bytes {
            return Err(ExportLimitExceeded {
                limit: ExportLimit::Bytes,
                value: estimated_bytes,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Checks against the default caps.
pub fn check_limits(rows: usize, estimated_bytes: u64) -> Result<(), ExportLimitExceeded> {
    ExportLimits::default().check(rows, estimated_bytes)
}

/// Inputs to the pre-flight size projection.
#[derive(Debug, Clone, Copy)]
pub struct SizeEstimate<'a> {
    pub rows: usize,
    pub headers: &'a [&'a str],
    pub with_metadata: bool,
    pub avg_cell_len: u64,
}

impl<'a> SizeEstimate<'a> {
    pub fn new(rows: usize, headers: &'a [&'a str], with_metadata: bool) -> Self {
        Self {
            rows,
            headers,
            with_metadata,
            avg_cell_len: DEFAULT_AVG_CELL_LEN,
        }
    }

    /// `header + metadata + rows * (columns * (avg_cell_len + 2) + 1)`.
    pub fn bytes(&self) -> u64 {
        let columns = self.headers.len() as u64;
        let header_bytes = BOM_BYTES
            + self
                .headers
                .iter()
                .map(|header| header.len() as u64)
                .sum::<u64>()
            + columns.saturating_sub(1)
            + 1;
        let metadata_bytes = if self.with_metadata {
            METADATA_ESTIMATE_BYTES
        } else {
            0
        };
        let row_bytes = columns
            .saturating_mul(self.avg_cell_len + 2)
            .saturating_add(1);
        header_bytes
            .saturating_add(metadata_bytes)
            .saturating_add((self.rows as u64).saturating_mul(row_bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportLimit {
    Rows,
    Bytes,
}

/// Export rejected before generation; `Display` is the caller-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportLimitExceeded {
    pub limit: ExportLimit,
    pub value: u64,
    pub max: u64,
}

impl ExportLimitExceeded {
    pub fn overflow(&self) -> u64 {
        self.value.saturating_sub(self.max)
    }
}

impl fmt::Display for ExportLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            ExportLimit::Rows => write!(
                f,
                "export has {} rows, which exceeds the limit of {} rows by {}",
                self.value,
                self.max,
                self.overflow()
            ),
            ExportLimit::Bytes => write!(
                f,
                "estimated export size of {} bytes exceeds the limit of {} bytes by {}",
                self.value,
                self.max,
                self.overflow()
            ),
        }
    }
}

impl std::error::Error for ExportLimitExceeded {}
