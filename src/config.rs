//! Runtime configuration: file locations, the rebuild pipeline and the console
//! display cap. Defaults match the layout the program ships with; each path
//! (and the dataset download URL) can be overridden through `F1DB_*`
//! environment variables.

use std::path::PathBuf;

use crate::pipeline::PipelineStep;
use crate::system_paths::{repo_queries_file, repo_sql_dir, resolve_or_bundled};

pub const DEFAULT_DATABASE_FILE: &str = "f1.db";
pub const DEFAULT_CSV_DIR: &str = "raw_data_files";
pub const DEFAULT_CUSTOM_CSV_DIR: &str = "custom_data_files";
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts/sql";
pub const DEFAULT_QUERIES_FILE: &str = "scripts/queries.yaml";
pub const BASE_SCHEMA_SCRIPT: &str = "define_base_tables.sql";
pub const CUSTOM_SCHEMA_SCRIPT: &str = "define_custom_tables.sql";
pub const STARTUP_SCRIPT: &str = "display_tables.sql";
pub const CONSOLE_OUTPUT_ROW_LIMIT: usize = 20;
pub const DEFAULT_DOWNLOAD_URL: &str = "http://ergast.com/downloads/f1db_csv.zip";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_file: PathBuf,
    pub csv_dir: PathBuf,
    /// Optional extra tables; loaded on rebuild only when the directory exists.
    pub custom_csv_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub queries_file: PathBuf,
    pub base_schema_script: String,
    pub custom_schema_script: String,
    pub startup_script: Option<String>,
    pub pipeline: Vec<PipelineStep>,
    pub console_row_limit: usize,
    /// Zip archive of the CSV dataset, fetched by `--download`.
    pub download_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            csv_dir: PathBuf::from(DEFAULT_CSV_DIR),
            custom_csv_dir: PathBuf::from(DEFAULT_CUSTOM_CSV_DIR),
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
            queries_file: PathBuf::from(DEFAULT_QUERIES_FILE),
            base_schema_script: BASE_SCHEMA_SCRIPT.to_string(),
            custom_schema_script: CUSTOM_SCHEMA_SCRIPT.to_string(),
            startup_script: Some(STARTUP_SCRIPT.to_string()),
            pipeline: default_pipeline(),
            console_row_limit: CONSOLE_OUTPUT_ROW_LIMIT,
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = lookup("F1DB_DATABASE") { cfg.database_file = PathBuf::from(v); }
        if let Some(v) = lookup("F1DB_CSV_DIR") { cfg.csv_dir = PathBuf::from(v); }
        if let Some(v) = lookup("F1DB_CUSTOM_CSV_DIR") { cfg.custom_csv_dir = PathBuf::from(v); }
        if let Some(v) = lookup("F1DB_SCRIPTS_DIR") { cfg.scripts_dir = PathBuf::from(v); }
        if let Some(v) = lookup("F1DB_QUERIES") { cfg.queries_file = PathBuf::from(v); }
        if let Some(v) = lookup("F1DB_DOWNLOAD_URL").filter(|v| !v.trim().is_empty()) { cfg.download_url = v; }
        if let Some(n) = lookup("F1DB_ROW_LIMIT").and_then(|v| v.trim().parse::<usize>().ok()) {
            cfg.console_row_limit = n.max(1);
        }
        cfg.scripts_dir = resolve_or_bundled(&cfg.scripts_dir, repo_sql_dir());
        cfg.queries_file = resolve_or_bundled(&cfg.queries_file, repo_queries_file());
        cfg
    }

    /// Scripts that define schemas rather than compute anything; the console
    /// hides them from its script menu.
    pub fn is_schema_script(&self, name: &str) -> bool {
        name == self.base_schema_script || name == self.custom_schema_script
    }
}

/// The derived-table steps run on every rebuild, in dependency order.
pub fn default_pipeline() -> Vec<PipelineStep> {
    vec![
        PipelineStep::new("extended_base_tables", "extended_base_tables.sql", &[]),
        PipelineStep::new("retirements", "retirements.sql", &["extended_base_tables"]),
        PipelineStep::new("lap_positions", "lap_positions.sql", &["extended_base_tables", "retirements"]),
        PipelineStep::new("overtakes", "overtakes.sql", &["lap_positions", "retirements"]),
    ]
}
