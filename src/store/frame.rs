use polars::prelude::*;
use rusqlite::types::Value;

use super::{column_names, display_value, quote_identifier, Store};
use crate::error::F1dbResult;

/// Build a typed column from engine values: all-integer columns become Int64,
/// numeric columns Float64, anything else String. NULLs stay null.
pub fn column_from_values(name: &str, values: &[Value]) -> Column {
    let is_int = values.iter().all(|v| matches!(v, Value::Null | Value::Integer(_)));
    let is_num = values.iter().all(|v| matches!(v, Value::Null | Value::Integer(_) | Value::Real(_)));
    let series = if is_int {
        let data: Vec<Option<i64>> = values.iter().map(|v| match v { Value::Integer(i) => Some(*i), _ => None }).collect();
        Series::new(name.into(), data)
    } else if is_num {
        let data: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Some(*i as f64),
                Value::Real(r) => Some(*r),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data)
    } else {
        let data: Vec<Option<String>> = values
            .iter()
            .map(|v| match v { Value::Null => None, other => Some(display_value(other)) })
            .collect();
        Series::new(name.into(), data)
    };
    series.into_column()
}

impl Store {
    /// Materialize a statement into a frame. The caller owns the frame; the
    /// store keeps nothing.
    pub fn frame(&self, sql: &str) -> F1dbResult<DataFrame> {
        let mut stmt = self.conn.prepare(sql)?;
        let names = column_names(&stmt);
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, col) in columns.iter_mut().enumerate() {
                col.push(row.get::<_, Value>(i)?);
            }
        }
        let cols: Vec<Column> = names.iter().zip(&columns).map(|(n, v)| column_from_values(n, v)).collect();
        Ok(DataFrame::new(cols)?)
    }

    pub fn table_frame(&self, table: &str) -> F1dbResult<DataFrame> {
        self.frame(&format!("SELECT * FROM {}", quote_identifier(table)?))
    }
}
