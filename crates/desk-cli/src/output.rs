//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::collections::BTreeSet;
use std::io::Write;

use desk_collection::CollectionSnapshot;
use desk_tail::LogEntry;
use serde::Serialize;

use crate::cli::Format;
use crate::client::Row;
use crate::error::CliError;

/// Widest cell printed in table output.
const MAX_CELL_WIDTH: usize = 32;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write one streamed record: a single JSON line, or a table row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_line<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// One settled page of a resource collection.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    /// Resource name.
    pub resource: String,
    /// Page shown.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
    /// Pages implied by the total count.
    pub page_count: u64,
    /// Items matching the filters.
    pub total_count: u64,
    /// The page lies beyond the last page.
    pub past_end: bool,
    /// Rows of the page, as returned by the server.
    pub items: Vec<Row>,
}

impl PageView {
    /// Build a view from a settled snapshot.
    #[must_use]
    pub fn from_snapshot(resource: impl Into<String>, snapshot: &CollectionSnapshot<Row>) -> Self {
        Self {
            resource: resource.into(),
            page: snapshot.page,
            page_size: snapshot.page_size,
            page_count: snapshot.page_count(),
            total_count: snapshot.total_count,
            past_end: snapshot.is_past_end(),
            items: snapshot.items.to_vec(),
        }
    }

    fn columns(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .items
            .iter()
            .filter_map(Row::as_object)
            .flat_map(serde_json::Map::keys)
            .collect();
        if keys.is_empty() {
            vec!["value".to_string()]
        } else {
            keys.into_iter().cloned().collect()
        }
    }
}

impl TableDisplay for PageView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.items.is_empty() {
            writeln!(writer, "No {} found", self.resource)?;
        } else {
            let columns = self.columns();
            let rows: Vec<Vec<String>> = self
                .items
                .iter()
                .map(|item| {
                    columns
                        .iter()
                        .map(|column| match item {
                            Row::Object(map) => map.get(column).map(cell).unwrap_or_default(),
                            other => cell(other),
                        })
                        .collect()
                })
                .collect();

            let widths: Vec<usize> = columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    rows.iter()
                        .map(|row| row[i].chars().count())
                        .chain(std::iter::once(column.chars().count()))
                        .max()
                        .unwrap_or(0)
                        .min(MAX_CELL_WIDTH)
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(column, &width)| format!("{:<width$}", column.to_uppercase()))
                .collect();
            writeln!(writer, "{}", header.join("  ").trim_end())?;
            let rule = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
            writeln!(writer, "{}", "─".repeat(rule))?;

            for row in &rows {
                let line: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|(value, &width)| format!("{:<width$}", truncate(value, width)))
                    .collect();
                writeln!(writer, "{}", line.join("  ").trim_end())?;
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "page {} of {} (total {})",
            self.page, self.page_count, self.total_count
        )?;
        if self.past_end {
            writeln!(writer, "page {} is past the last page", self.page)?;
        }
        Ok(())
    }
}

/// One live log entry.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct LogLine(pub LogEntry);

impl TableDisplay for LogLine {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let entry = &self.0;
        let properties: Vec<String> = entry
            .properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        writeln!(
            writer,
            "{}  {:<12}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.kind,
            properties.join(" ")
        )?;
        Ok(())
    }
}

fn cell(value: &Row) -> String {
    match value {
        Row::Null => String::new(),
        Row::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
