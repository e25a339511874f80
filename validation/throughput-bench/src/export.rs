//! Delimited text export of a [`ResultTable`].

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{BenchError, BenchResult};
use crate::results::ResultTable;

/// Writes result tables as delimited text, one row per load level.
#[derive(Debug, Clone)]
pub struct DelimitedExporter {
    path: PathBuf,
    delimiter: char,
}

impl DelimitedExporter {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `table`: header row, then one line per row key. Absent cells are empty.
    pub fn render<R, V>(&self, table: &ResultTable<R, V>) -> String
    where
        R: Ord + Copy + Display,
        V: Copy + Display,
    {
        let sep = self.delimiter.to_string();
        let columns = table.column_names();

        let mut header = vec![table.row_index_name().to_string()];
        header.extend(columns.iter().map(|c| c.to_string()));

        let mut out = header.join(&sep);
        out.push('\n');

        for index in table.row_index() {
            let mut fields = vec![index.to_string()];
            fields.extend(columns.iter().map(|c| {
                table
                    .value(c, index)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
            out.push_str(&fields.join(&sep));
            out.push('\n');
        }
        out
    }

    /// Write `table` to the configured path, creating parent directories as needed.
    ///
    /// The table is only borrowed so callers can fall back to another sink on failure.
    pub fn export<R, V>(&self, table: &ResultTable<R, V>) -> BenchResult<()>
    where
        R: Ord + Copy + Display,
        V: Copy + Display,
    {
        let content = self.render(table);
        self.write(&content).map_err(|source| BenchError::Export {
            path: self.path.clone(),
            source,
        })?;
        info!(
            path = %self.path.display(),
            rows = table.row_index().len(),
            columns = table.column_names().len(),
            "Results written"
        );
        Ok(())
    }

    fn write(&self, content: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(content.as_bytes())?;
        writer.flush()
    }
}
