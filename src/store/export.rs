use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use tracing::{debug, info};

use super::Store;
use crate::error::F1dbResult;

/// Written for NULL cells; the loader maps it back to NULL on import.
pub const NULL_TOKEN: &str = "\\N";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub table: String,
    pub path: PathBuf,
    pub rows: usize,
}

fn quote(text: &str) -> String { format!("\"{}\"", text.replace('"', "\"\"")) }

/// True for `\N` and for it behind any number of extra backslashes (`\\N`,
/// `\\\N`, ...).
pub fn is_null_token_like(text: &str) -> bool {
    text.len() >= NULL_TOKEN.len() && text.ends_with('N') && text[..text.len() - 1].bytes().all(|b| b == b'\\')
}

/// One CSV cell: text is quoted, numbers are not, NULL becomes `\N`.
///
/// Text that reads like the NULL marker gains one leading backslash so the
/// loader can restore it instead of reading NULL.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => NULL_TOKEN.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) if is_null_token_like(s) => quote(&format!("\\{s}")),
        Value::Text(s) => quote(s),
        Value::Blob(b) => quote(&String::from_utf8_lossy(b)),
    }
}

impl Store {
    /// Stream every row of `table` to a CSV file (default `<table>.csv`),
    /// header first. Rows go straight from the cursor to the writer.
    pub fn export_table(&self, table: &str, output: Option<&Path>) -> F1dbResult<ExportSummary> {
        let _enter = self.ctx.span().enter();
        let path = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(format!("{table}.csv")));
        let mut cursor = self.cursor(table)?;
        debug!(table, path = %path.display(), "exporting table");

        let mut out = BufWriter::new(File::create(&path)?);
        let header: Vec<String> = cursor.columns().iter().map(|c| quote(c)).collect();
        writeln!(out, "{}", header.join(","))?;
        let mut rows = 0usize;
        for row in cursor.rows()? {
            let cells: Vec<String> = row?.iter().map(format_cell).collect();
            writeln!(out, "{}", cells.join(","))?;
            rows += 1;
        }
        out.flush()?;
        info!(table, rows, path = %path.display(), "export complete");
        Ok(ExportSummary { table: table.to_string(), path, rows })
    }
}
