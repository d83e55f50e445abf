//! Where finished reports go.

use crate::domain::QualityReport;

/// Port for persisting or printing quality reports.
pub trait ReportOutput: Send + Sync {
    /// Writes one report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, report: &QualityReport) -> anyhow::Result<()>;

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}
