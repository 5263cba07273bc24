//! CSV summary of one evaluation run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column names, in output order.
pub const REPORT_COLUMNS: [&str; 4] = [
    "original_size",
    "hull_size",
    "chamfer_distance",
    "normal_consistency",
];

/// Failure to write a report file.
#[derive(Debug, Error)]
#[error("Failed to write report {}: {source}", path.display())]
pub struct ReportError {
    /// The report path.
    pub path: PathBuf,
    /// The underlying error.
    #[source]
    pub source: std::io::Error,
}

/// One evaluated cloud.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Point count of the raw cloud.
    pub original_size: usize,
    /// Point count of the cleaned (interior) cloud.
    pub hull_size: usize,
    /// Combined Chamfer distance between raw and cleaned clouds.
    pub chamfer_distance: f64,
    /// Combined normal consistency between raw and cleaned clouds.
    pub normal_consistency: f64,
}

impl ReportRecord {
    /// Writes the CSV header line.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_csv_header(writer: &mut impl Write) -> std::io::Result<()> {
        writeln!(writer, "{}", REPORT_COLUMNS.join(","))
    }

    /// Writes this record as a CSV row.
    ///
    /// Floats use the shortest representation that parses back exactly.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_csv_row(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            writer,
            "{},{},{},{}",
            self.original_size, self.hull_size, self.chamfer_distance, self.normal_consistency
        )
    }
}

/// Writes `record` to `path` as a CSV file with a header row.
///
/// An existing file is replaced.
///
/// # Errors
///
/// Returns [`ReportError`] naming `path` if the file cannot be written.
pub fn write_report(record: &ReportRecord, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = path.as_ref();
    let wrap = |source| ReportError {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(wrap)?);
    ReportRecord::write_csv_header(&mut writer)
        .and_then(|()| record.write_csv_row(&mut writer))
        .and_then(|()| writer.flush())
        .map_err(wrap)?;

    tracing::info!(path = %path.display(), "wrote evaluation report");
    Ok(())
}
