//! Subtree export
//!
//! Serializes the subtree at the configured base path to a new file, in
//! either the system view or the document view encoding.

use crate::{
    config::Config,
    error::{JackError, Result},
    repo::{ExportFormat, Session},
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, instrument};

/// Exporter over an open session
pub struct Exporter<'a> {
    config: &'a Config,
}

impl<'a> Exporter<'a> {
    /// Create a new exporter for the given configuration
    #[must_use]
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Export the subtree at the configured base path to `file`.
    ///
    /// Refuses an existing destination before any repository call. A failure
    /// after the file was created may leave a partial file behind; no
    /// cleanup is attempted.
    #[instrument(skip(self, session))]
    pub fn export(
        &self,
        session: &mut dyn Session,
        file: &Path,
        format: ExportFormat,
    ) -> Result<()> {
        if file.exists() {
            return Err(JackError::validation(format!(
                "Export file {} is existing, can not export",
                file.display()
            )));
        }

        self.write_snapshot(session, file, format)
            .map_err(|e| JackError::export(file, self.config.base_path.as_str(), e))?;

        info!("Exported the repository to {}", file.display());
        Ok(())
    }

    fn write_snapshot(
        &self,
        session: &mut dyn Session,
        file: &Path,
        format: ExportFormat,
    ) -> Result<()> {
        let out = File::create(file).map_err(|e| JackError::file_system("create", file, e))?;
        let mut sink = BufWriter::new(out);
        session.export(&self.config.base_path, format, &mut sink)?;
        sink.flush()
            .map_err(|e| JackError::file_system("flush", file, e))?;
        Ok(())
    }
}
