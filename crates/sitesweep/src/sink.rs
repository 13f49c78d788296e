//! CSV record sink.
//!
//! Every run produces a file with a header row, even when nothing was
//! collected, so a reader can tell "ran and found nothing" apart from
//! "never ran". Columns always follow the plugin's schema order.

use std::fs;
use std::path::Path;

use crate::error::SinkError;
use crate::types::{FieldSchema, Record};

/// Write `records` to `path`, replacing any existing file.
///
/// Returns the number of data rows written (header excluded).
pub fn write_records(
    schema: &FieldSchema,
    records: &[Record],
    path: &Path,
) -> Result<usize, SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let file = fs::File::create(path).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);

    writer.write_record(schema.fields)?;
    for record in records {
        writer.write_record(record.row(schema))?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Saved {} records to {}", records.len(), path.display());
    Ok(records.len())
}

/// A CSV file read back as header plus data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a file produced by [`write_records`].
pub fn read_table(path: &Path) -> Result<Table, SinkError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|row| row.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;

    Ok(Table { headers, rows })
}
