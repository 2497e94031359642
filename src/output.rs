//! Row rendering.
//!
//! Writes rows to a caller-supplied sink, one row per line, reading columns
//! by name.

use std::io::Write;

use crate::db::{Row, Value};
use crate::error::{ProbeError, Result};

/// Output format for rendered rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `column: value, column: value`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Renders rows into a sink.
pub struct RowWriter<W: Write> {
    out: W,
    format: OutputFormat,
    columns: Option<Vec<String>>,
    rows_written: usize,
}

impl<W: Write> RowWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            columns: None,
            rows_written: 0,
        }
    }

    /// Restricts output to the named columns, in the given order. A row
    /// lacking one of them fails with `ColumnNotFound`.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = (!columns.is_empty()).then_some(columns);
        self
    }

    /// Writes one row as one line.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        let fields = self.fields(row)?;
        match self.format {
            OutputFormat::Text => {
                let line = fields
                    .iter()
                    .map(|(name, value)| format!("{name}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(self.out, "{line}")?;
            }
            OutputFormat::Json => {
                let object: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_json()))
                    .collect();
                let line = serde_json::to_string(&object)
                    .map_err(|e| ProbeError::internal(format!("Cannot encode row: {e}")))?;
                writeln!(self.out, "{line}")?;
            }
        }
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flushes and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn fields<'r>(&self, row: &'r Row) -> Result<Vec<(&'r str, &'r Value)>> {
        match &self.columns {
            None => Ok(row.iter().collect()),
            Some(names) => names
                .iter()
                .map(|name| -> Result<(&'r str, &'r Value)> {
                    let idx = row
                        .columns()
                        .iter()
                        .position(|c| &c.name == name)
                        .ok_or_else(|| ProbeError::column_not_found(name.as_str()))?;
                    Ok((row.columns()[idx].name.as_str(), &row.values()[idx]))
                })
                .collect(),
        }
    }
}
