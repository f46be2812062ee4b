use serde_json::Value;

use super::ReportRow;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Output column: `key` selects the row value, `header` is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumn {
    pub key: String,
    pub header: String,
}

impl CsvColumn {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
        }
    }

    /// Column whose header is its key.
    pub fn plain(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            header: key.clone(),
            key,
        }
    }
}

/// Ordered key/value pairs rendered as `# k1=v1; k2=v2` above the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMetadata {
    entries: Vec<(String, String)>,
}

impl ExportMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn line(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let body = self
            .entries
            .iter()
            .map(|(key, value)| format!("{}={}", single_line(key), single_line(value)))
            .collect::<Vec<_>>()
            .join("; ");
        Some(format!("# {body}"))
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Text form of a cell. Nested values are embedded as compact JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => nested.to_string(),
    }
}

/// Renders BOM, optional metadata line, header and rows.
///
/// Cells containing a comma, quote or line break are quoted with inner
/// quotes doubled. Lines end with `\n`.
pub fn build_csv(
    columns: &[CsvColumn],
    rows: &[ReportRow],
    metadata: &ExportMetadata,
) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = Vec::with_capacity(64 + rows.len() * columns.len() * 16);
    buffer.extend_from_slice(UTF8_BOM);
    if let Some(line) = metadata.line() {
        buffer.extend_from_slice(line.as_bytes());
        buffer.push(b'\n');
    }
    if columns.is_empty() {
        return Ok(buffer);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(buffer);

    writer.write_record(columns.iter().map(|column| column.header.as_str()))?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| cell_text(row.get(&column.key))))?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
