//! Store handle: one SQLite connection per session with the extension
//! functions installed before anything else runs.
//!
//! The connection closes when the handle drops, on every exit path. Call
//! [`Store::close`] to observe close errors explicitly.

use std::fs;

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, Statement};
use serde_json::json;
use tracing::{debug, info};

use crate::context::SessionContext;
use crate::error::{F1dbError, F1dbResult};
use crate::extensions::ExtensionRegistry;
use crate::scripts::{controls_transactions, is_blank, ScriptLibrary, ScriptParams};

mod export;
mod frame;

pub use export::{format_cell, is_null_token_like, ExportSummary, NULL_TOKEN};
pub use frame::column_from_values;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Quote a table or column name for splicing into SQL. Only plain identifiers
/// are accepted.
pub fn quote_identifier(name: &str) -> F1dbResult<String> {
    if IDENTIFIER.is_match(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(F1dbError::InvalidIdentifier(name.to_string()))
    }
}

/// Render one engine value for console display.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

pub(crate) fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

pub(crate) fn row_values(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width).map(|i| row.get::<_, Value>(i)).collect()
}

/// Display-bounded result of [`Store::query`].
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// More rows existed than the display cap allowed.
    pub truncated: bool,
}

impl QueryResult {
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|r| {
                serde_json::Value::Array(
                    r.iter()
                        .map(|v| match v {
                            Value::Null => serde_json::Value::Null,
                            Value::Integer(i) => json!(i),
                            Value::Real(f) => json!(f),
                            other => json!(display_value(other)),
                        })
                        .collect(),
                )
            })
            .collect();
        json!({ "columns": self.columns, "rows": rows, "truncated": self.truncated })
    }
}

/// Lazy cursor over a whole table. Rows are pulled from the engine as the
/// iterator advances; nothing is cached between calls.
pub struct TableCursor<'s> {
    stmt: Statement<'s>,
    columns: Vec<String>,
}

impl<'s> TableCursor<'s> {
    fn new(stmt: Statement<'s>) -> Self {
        let columns = column_names(&stmt);
        Self { stmt, columns }
    }

    pub fn columns(&self) -> &[String] { &self.columns }

    pub fn rows(&mut self) -> F1dbResult<impl Iterator<Item = F1dbResult<Vec<Value>>> + '_> {
        let width = self.columns.len();
        let rows = self.stmt.query_map([], move |row| row_values(row, width))?;
        Ok(rows.map(|r| r.map_err(F1dbError::from)))
    }
}

#[derive(Debug)]
pub struct Store {
    conn: Connection,
    scripts: ScriptLibrary,
    ctx: SessionContext,
}

impl Store {
    /// Open (creating if needed) the configured database file.
    pub fn open(ctx: &SessionContext) -> F1dbResult<Self> {
        let path = &ctx.config().database_file;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(ctx, conn, &ExtensionRegistry::builtin())
    }

    pub fn open_in_memory(ctx: &SessionContext) -> F1dbResult<Self> {
        Self::with_connection(ctx, Connection::open_in_memory()?, &ExtensionRegistry::builtin())
    }

    /// Wrap an existing connection, installing `registry` first.
    pub fn with_connection(ctx: &SessionContext, conn: Connection, registry: &ExtensionRegistry) -> F1dbResult<Self> {
        let _enter = ctx.span().enter();
        registry.install(&conn)?;
        debug!(functions = registry.len(), "store handle ready");
        Ok(Self { conn, scripts: ScriptLibrary::new(&ctx.config().scripts_dir), ctx: ctx.clone() })
    }

    pub fn context(&self) -> &SessionContext { &self.ctx }

    pub fn scripts(&self) -> &ScriptLibrary { &self.scripts }

    pub(crate) fn connection(&self) -> &Connection { &self.conn }

    /// Render the named script with `params` and execute it as one
    /// transaction. Engine errors come back unmodified apart from naming the
    /// script; nothing is retried.
    ///
    /// A script that manages its own transactions (`BEGIN`/`COMMIT`,
    /// `SAVEPOINT`, `VACUUM`, ...) runs as written instead, and is only as
    /// atomic as it makes itself.
    pub fn run_script(&self, name: &str, params: &ScriptParams) -> F1dbResult<()> {
        let _enter = self.ctx.span().enter();
        let script = self.scripts.load(name)?;
        let sql = script.render(params)?;
        if controls_transactions(&sql) {
            debug!(script = script.name(), params = params.len(), "running script with its own transactions");
            self.conn.execute_batch(&sql).map_err(|e| F1dbError::script(script.name(), e))?;
            info!(script = script.name(), "script complete");
            return Ok(());
        }
        debug!(script = script.name(), params = params.len(), "running script");
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&sql).map_err(|e| F1dbError::script(script.name(), e))?;
        tx.commit()?;
        info!(script = script.name(), "script complete");
        Ok(())
    }

    /// Run one read-only statement and keep at most the configured display cap
    /// of rows.
    pub fn query(&self, sql: &str) -> F1dbResult<QueryResult> {
        let _enter = self.ctx.span().enter();
        if is_blank(sql) {
            return Err(F1dbError::EmptyStatement);
        }
        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(F1dbError::NotReadOnly(sql.trim().to_string()));
        }
        let columns = column_names(&stmt);
        let limit = self.ctx.config().console_row_limit;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next()? {
            if out.len() == limit {
                truncated = true;
                break;
            }
            out.push(row_values(row, columns.len())?);
        }
        Ok(QueryResult { columns, rows: out, truncated })
    }

    pub fn cursor(&self, table: &str) -> F1dbResult<TableCursor<'_>> {
        let stmt = self.conn.prepare(&format!("SELECT * FROM {}", quote_identifier(table)?))?;
        Ok(TableCursor::new(stmt))
    }

    pub fn table_names(&self) -> F1dbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn has_table(&self, table: &str) -> F1dbResult<bool> { Ok(self.table_names()?.iter().any(|t| t == table)) }

    pub fn row_count(&self, table: &str) -> F1dbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn close(self) -> F1dbResult<()> {
        self.conn.close().map_err(|(_, e)| F1dbError::from(e))?;
        debug!("store handle closed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
