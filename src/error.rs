//! Unified error model for the store, loader, pipeline and catalog layers.
//! Core layers never swallow engine or script errors; they surface here so the
//! console (or any other caller) can decide whether to retry, prompt or abort.

use std::path::PathBuf;

use thiserror::Error;

use crate::extensions::DOMAIN_ERROR_TAG;

#[derive(Debug, Error)]
pub enum F1dbError {
    /// A required directory or store file is absent. Surfaced to the operator
    /// as a decision point, never silently defaulted.
    #[error("{what} not found at '{}'", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("script '{script}' failed: {source}")]
    Script {
        script: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("script '{script}' needs values for: {}", names.join(", "))]
    MissingParameters { script: String, names: Vec<String> },

    #[error("no script named '{name}' in '{}'", dir.display())]
    UnknownScript { name: String, dir: PathBuf },

    #[error("no named query called '{0}'")]
    UnknownQuery(String),

    #[error("'{0}' is not a valid table identifier")]
    InvalidIdentifier(String),

    #[error("no SQL statement given (only whitespace or comments)")]
    EmptyStatement,

    #[error("only read-only statements can be queried, got: {0}")]
    NotReadOnly(String),

    #[error("pipeline step '{step}' depends on '{dependency}', which is declared after it")]
    PipelineOrder { step: String, dependency: String },

    #[error("pipeline step '{step}' depends on undeclared step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("pipeline step '{0}' is declared more than once")]
    DuplicateStep(String),

    /// Insufficient data for a statistic, raised by an aggregate's finalize.
    /// `script` is set when the failing statement came from a script.
    #[error("{}{message}", script.as_deref().map(|s| format!("script '{s}': ")).unwrap_or_default())]
    AggregateDomain { script: Option<String>, message: String },

    #[error("loading table '{table}' failed: {source}")]
    Load {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("reading '{}' failed: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },

    #[error("frame error: {0}")]
    Frame(#[from] polars::error::PolarsError),

    #[error("query definitions in '{}' are invalid: {source}", path.display())]
    Definitions {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("downloading '{url}' failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unpacking '{}' failed: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("sqlite: {0}")]
    Sql(rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type F1dbResult<T> = Result<T, F1dbError>;

impl F1dbError {
    /// Stable short code, handy for log fields and console messages.
    pub fn code_str(&self) -> &'static str {
        match self {
            F1dbError::MissingInput { .. } => "missing_input",
            F1dbError::Script { .. } => "script_error",
            F1dbError::MissingParameters { .. } => "missing_parameters",
            F1dbError::UnknownScript { .. } => "unknown_script",
            F1dbError::UnknownQuery(_) => "unknown_query",
            F1dbError::InvalidIdentifier(_) => "invalid_identifier",
            F1dbError::EmptyStatement => "empty_statement",
            F1dbError::NotReadOnly(_) => "not_read_only",
            F1dbError::PipelineOrder { .. } => "pipeline_order",
            F1dbError::UnknownDependency { .. } => "unknown_dependency",
            F1dbError::DuplicateStep(_) => "duplicate_step",
            F1dbError::AggregateDomain { .. } => "aggregate_domain",
            F1dbError::Load { .. } => "load_error",
            F1dbError::Csv { .. } => "csv_error",
            F1dbError::Frame(_) => "frame_error",
            F1dbError::Definitions { .. } => "definitions_error",
            F1dbError::Download { .. } => "download_error",
            F1dbError::Archive { .. } => "archive_error",
            F1dbError::Sql(_) => "sql_error",
            F1dbError::Io(_) => "io_error",
        }
    }

    /// Wrap an engine error raised while executing `script`. Aggregate domain
    /// failures keep their own variant so callers can tell them apart.
    pub fn script(script: impl Into<String>, source: rusqlite::Error) -> Self {
        match domain_message(&source) {
            Some(message) => F1dbError::AggregateDomain { script: Some(script.into()), message },
            None => F1dbError::Script { script: script.into(), source },
        }
    }

    /// True for errors the console can recover from by re-prompting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            F1dbError::Script { .. }
                | F1dbError::Sql(_)
                | F1dbError::AggregateDomain { .. }
                | F1dbError::MissingParameters { .. }
                | F1dbError::UnknownScript { .. }
                | F1dbError::UnknownQuery(_)
                | F1dbError::InvalidIdentifier(_)
                | F1dbError::EmptyStatement
                | F1dbError::NotReadOnly(_)
                | F1dbError::Download { .. }
                | F1dbError::Archive { .. }
        )
    }
}

impl From<rusqlite::Error> for F1dbError {
    fn from(err: rusqlite::Error) -> Self {
        match domain_message(&err) {
            Some(message) => F1dbError::AggregateDomain { script: None, message },
            None => F1dbError::Sql(err),
        }
    }
}

// SQLite reports a user function failure as a generic failure carrying the
// function's message; the tag is what survives the trip through the engine.
fn domain_message(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.contains(DOMAIN_ERROR_TAG) => {
            Some(message.clone())
        }
        rusqlite::Error::UserFunctionError(inner) if inner.to_string().contains(DOMAIN_ERROR_TAG) => {
            Some(inner.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
