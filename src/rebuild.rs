//! Full rebuild: drop the store file, define the schema, load the CSVs and run
//! the derived-table pipeline from the first step.

use std::fs;

use tracing::info;

use crate::config::Config;
use crate::context::SessionContext;
use crate::error::{F1dbError, F1dbResult};
use crate::loader::BaseLoader;
use crate::pipeline::Pipeline;
use crate::scripts::ScriptParams;
use crate::store::Store;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// (table, rows) for base and custom tables, in load order.
    pub tables_loaded: Vec<(String, usize)>,
    pub steps_completed: Vec<String>,
}

impl RebuildReport {
    pub fn rows_loaded(&self) -> usize { self.tables_loaded.iter().map(|(_, n)| n).sum() }
}

fn dir_has_csv(dir: &std::path::Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|e| e.path().extension().and_then(|x| x.to_str()).map(|x| x.eq_ignore_ascii_case("csv")).unwrap_or(false))
        })
        .unwrap_or(false)
}

/// Inputs needed before the console can open a store. The first missing one
/// is reported; the caller decides whether to rebuild.
pub fn check_inputs(config: &Config) -> F1dbResult<()> {
    if !config.csv_dir.is_dir() || !dir_has_csv(&config.csv_dir) {
        return Err(F1dbError::MissingInput { what: "csv directory", path: config.csv_dir.clone() });
    }
    if !config.database_file.is_file() {
        return Err(F1dbError::MissingInput { what: "database file", path: config.database_file.clone() });
    }
    Ok(())
}

/// Rebuild the store from scratch and close the handle used for it.
pub fn rebuild_database(ctx: &SessionContext) -> F1dbResult<RebuildReport> {
    let _enter = ctx.span().enter();
    let config = ctx.config();
    if !config.csv_dir.is_dir() {
        return Err(F1dbError::MissingInput { what: "csv directory", path: config.csv_dir.clone() });
    }
    // Validate the step order before the old store is gone.
    let pipeline = Pipeline::new(config.pipeline.clone())?;

    if config.database_file.exists() {
        info!(path = %config.database_file.display(), "removing existing store");
        fs::remove_file(&config.database_file)?;
    }
    let store = Store::open(ctx)?;
    let params = ScriptParams::new();
    let loader = BaseLoader::new(&store);
    let mut report = RebuildReport::default();

    info!("defining base tables");
    store.run_script(&config.base_schema_script, &params)?;
    report.tables_loaded.extend(loader.load_directory(&config.csv_dir)?.tables);

    if config.custom_csv_dir.is_dir() {
        info!("defining custom tables");
        store.run_script(&config.custom_schema_script, &params)?;
        report.tables_loaded.extend(loader.load_directory(&config.custom_csv_dir)?.tables);
    } else {
        info!(path = %config.custom_csv_dir.display(), "no custom data directory, skipping custom tables");
    }

    report.steps_completed = pipeline.run(&store)?.completed;
    store.close()?;
    info!(tables = report.tables_loaded.len(), rows = report.rows_loaded(), steps = report.steps_completed.len(), "rebuild complete");
    Ok(report)
}
