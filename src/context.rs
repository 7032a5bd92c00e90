//! Session context handed to every component instead of process-wide logger or
//! console state. It carries the configuration, the verbosity chosen on the
//! command line, and the span all session logging is recorded under.

use std::sync::Arc;

use tracing::Span;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionContext {
    config: Arc<Config>,
    verbosity: Verbosity,
    span: Span,
}

impl SessionContext {
    pub fn new(config: Config, verbosity: Verbosity) -> Self {
        let span = tracing::info_span!("f1db", db = %config.database_file.display());
        Self { config: Arc::new(config), verbosity, span }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn verbosity(&self) -> Verbosity { self.verbosity }

    pub fn span(&self) -> &Span { &self.span }

    pub fn is_quiet(&self) -> bool { self.verbosity == Verbosity::Quiet }
}

/// Console log sink for the current thread. Logging stops being routed to it
/// once the returned guard drops. `RUST_LOG` wins over `verbosity` when set.
pub fn init_console_logging(verbosity: Verbosity) -> tracing::subscriber::DefaultGuard {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(verbosity.filter_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_target(false).finish();
    tracing::subscriber::set_default(subscriber)
}
