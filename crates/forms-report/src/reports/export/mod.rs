//! CSV rendering and the pre-flight size limiter for report exports.
//!
//! Exports are built in memory; the row and byte caps bound that memory.
//! Raising the caps substantially calls for streaming rows straight into
//! the `csv::Writer` instead of collecting them first.

mod limits;
mod writer;

pub use limits::{
    check_limits, ExportLimit, ExportLimitExceeded, ExportLimits, SizeEstimate,
    DEFAULT_AVG_CELL_LEN, MAX_EXPORT_BYTES, MAX_EXPORT_ROWS, METADATA_ESTIMATE_BYTES,
    PREVIEW_ROWS,
};
pub use writer::{build_csv, cell_text, CsvColumn, ExportMetadata, UTF8_BOM};

/// One report row keyed by column key.
pub type ReportRow = serde_json::Map<String, serde_json::Value>;
