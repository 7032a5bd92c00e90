//! Named query catalog.
//!
//! A named query binds one script to the table it produces plus chart
//! metadata. Queries are lazy: nothing runs when the catalog is bound, the
//! script runs the first time its output is asked for, and after that it is
//! considered current until a new store handle is opened. Rows are never
//! cached here; every read goes back to the store.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{F1dbError, F1dbResult};
use crate::scripts::ScriptParams;
use crate::store::{ExportSummary, Store, TableCursor};

/// One chart over a query's output table. Only the column roles the console
/// cares about are typed; everything else is kept for the plotting tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSpec {
    pub title: String,
    pub figure_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl VisualizationSpec {
    /// Columns the chart reads, in x, y, color order without repeats.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::new();
        for c in [&self.x, &self.y, &self.color].into_iter().flatten() {
            if !cols.contains(&c.as_str()) {
                cols.push(c.as_str());
            }
        }
        cols
    }

    /// File stem derived from the title: `Lap Chart (1)` -> `lap_chart_1`.
    pub fn output_stem(&self) -> String {
        let mut stem = String::with_capacity(self.title.len());
        for ch in self.title.trim().chars() {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                stem.push(ch.to_ascii_lowercase());
            } else if ch.is_whitespace() && !stem.ends_with('_') {
                stem.push('_');
            }
        }
        let stem = stem.trim_matches('_').to_string();
        if stem.is_empty() { "visualization".to_string() } else { stem }
    }

    /// Project the chart's columns out of a query frame. A chart that names no
    /// columns gets the whole frame.
    pub fn frame(&self, query_frame: &DataFrame) -> F1dbResult<DataFrame> {
        let cols = self.columns();
        if cols.is_empty() {
            return Ok(query_frame.clone());
        }
        Ok(query_frame.select(cols)?)
    }

    /// Write the chart's data as `<dir>/<stem>.csv`.
    pub fn export_data(&self, query_frame: &DataFrame, dir: Option<&Path>) -> F1dbResult<PathBuf> {
        let mut df = self.frame(query_frame)?;
        let path = dir.unwrap_or_else(|| Path::new(".")).join(format!("{}.csv", self.output_stem()));
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        debug!(title = %self.title, path = %path.display(), rows = df.height(), "chart data written");
        Ok(path)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    pub output_table_name: String,
    pub sql_script_file_name: String,
    /// Default placeholder values; scalars are rendered as written.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub visualizations: Vec<VisualizationSpec>,
}

impl QueryDefinition {
    pub fn default_params(&self) -> ScriptParams {
        self.parameters
            .iter()
            .filter_map(|(k, v)| {
                let text = match v {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
                    _ => return None,
                };
                Some((k.clone(), text))
            })
            .collect()
    }
}

/// Parse a multi-document YAML stream, one definition per document.
pub fn parse_definitions(text: &str, origin: &Path) -> F1dbResult<Vec<QueryDefinition>> {
    let mut defs = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        let def = QueryDefinition::deserialize(doc)
            .map_err(|source| F1dbError::Definitions { path: origin.to_path_buf(), source })?;
        defs.push(def);
    }
    Ok(defs)
}

pub fn load_definitions(path: &Path) -> F1dbResult<Vec<QueryDefinition>> {
    if !path.is_file() {
        return Err(F1dbError::MissingInput { what: "query definitions", path: path.to_path_buf() });
    }
    let text = fs::read_to_string(path)?;
    parse_definitions(&text, path)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComputeState {
    #[default]
    Uncomputed,
    Computed,
}

#[derive(Clone, Debug)]
pub struct NamedQuery {
    definition: QueryDefinition,
    state: ComputeState,
}

impl NamedQuery {
    pub fn new(definition: QueryDefinition) -> Self { Self { definition, state: ComputeState::Uncomputed } }

    pub fn definition(&self) -> &QueryDefinition { &self.definition }

    pub fn name(&self) -> &str { &self.definition.name }

    pub fn state(&self) -> ComputeState { self.state }
}

/// Catalog bound to one store handle; compute state lives as long as both.
pub struct Catalog<'s> {
    store: &'s Store,
    queries: Vec<NamedQuery>,
}

impl<'s> Catalog<'s> {
    pub fn bind(store: &'s Store, definitions: Vec<QueryDefinition>) -> Self {
        debug!(queries = definitions.len(), "binding named queries");
        Self { store, queries: definitions.into_iter().map(NamedQuery::new).collect() }
    }

    /// Bind the definitions file named by the store's configuration.
    pub fn load(store: &'s Store) -> F1dbResult<Self> {
        let defs = load_definitions(&store.context().config().queries_file)?;
        Ok(Self::bind(store, defs))
    }

    pub fn names(&self) -> Vec<&str> { self.queries.iter().map(NamedQuery::name).collect() }

    pub fn queries(&self) -> &[NamedQuery] { &self.queries }

    pub fn len(&self) -> usize { self.queries.len() }

    pub fn is_empty(&self) -> bool { self.queries.is_empty() }

    pub fn get(&self, name: &str) -> F1dbResult<&NamedQuery> {
        self.queries.iter().find(|q| q.name() == name).ok_or_else(|| F1dbError::UnknownQuery(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> F1dbResult<&mut NamedQuery> {
        self.queries.iter_mut().find(|q| q.name() == name).ok_or_else(|| F1dbError::UnknownQuery(name.to_string()))
    }

    pub fn is_computed(&self, name: &str) -> F1dbResult<bool> { Ok(self.get(name)?.state == ComputeState::Computed) }

    /// Placeholders the bound script needs beyond the definition's defaults.
    pub fn missing_parameters(&self, name: &str) -> F1dbResult<Vec<String>> {
        let def = &self.get(name)?.definition;
        let script = self.store.scripts().load(&def.sql_script_file_name)?;
        Ok(script.missing(&def.default_params()))
    }

    /// Run the bound script unless it already ran on this handle. Returns
    /// whether it ran now.
    pub fn ensure_computed(&mut self, name: &str) -> F1dbResult<bool> { self.ensure_computed_with(name, &ScriptParams::new()) }

    /// As [`Catalog::ensure_computed`], with `overrides` merged over the
    /// definition's parameters. Overrides are ignored once computed.
    pub fn ensure_computed_with(&mut self, name: &str, overrides: &ScriptParams) -> F1dbResult<bool> {
        let store = self.store;
        let query = self.get_mut(name)?;
        if query.state == ComputeState::Computed {
            debug!(query = %name, "already computed");
            return Ok(false);
        }
        let mut params = query.definition.default_params();
        params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        store.run_script(&query.definition.sql_script_file_name, &params)?;
        query.state = ComputeState::Computed;
        info!(query = %name, table = %query.definition.output_table_name, "named query computed");
        Ok(true)
    }

    fn output_table(&mut self, name: &str) -> F1dbResult<String> {
        self.ensure_computed(name)?;
        Ok(self.get(name)?.definition.output_table_name.clone())
    }

    /// Lazy rows of the output table, read fresh from the store.
    pub fn rows(&mut self, name: &str) -> F1dbResult<TableCursor<'s>> {
        let table = self.output_table(name)?;
        self.store.cursor(&table)
    }

    /// The output table materialized as a frame owned by the caller.
    pub fn as_frame(&mut self, name: &str) -> F1dbResult<DataFrame> {
        let table = self.output_table(name)?;
        self.store.table_frame(&table)
    }

    pub fn export(&mut self, name: &str, output: Option<&Path>) -> F1dbResult<ExportSummary> {
        let table = self.output_table(name)?;
        self.store.export_table(&table, output)
    }

    /// Write the data behind one of the query's charts.
    pub fn export_visualization(&mut self, name: &str, index: usize, dir: Option<&Path>) -> F1dbResult<PathBuf> {
        let frame = self.as_frame(name)?;
        let viz = self
            .get(name)?
            .definition
            .visualizations
            .get(index)
            .ok_or_else(|| F1dbError::UnknownQuery(format!("{name}#{index}")))?;
        viz.export_data(&frame, dir)
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod catalog_tests;
