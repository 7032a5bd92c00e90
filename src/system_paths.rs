use std::path::{Path, PathBuf};

/// Centralized helpers for the repository's bundled script locations, so the
/// binary still finds its SQL when run from outside the checkout.

// ---- Repository defaults (relative to the crate root) ----
#[inline]
pub fn repo_scripts_root() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scripts") }

#[inline]
pub fn repo_sql_dir() -> PathBuf { repo_scripts_root().join("sql") }

#[inline]
pub fn repo_queries_file() -> PathBuf { repo_scripts_root().join("queries.yaml") }

/// Use `preferred` when it exists (or is absolute), otherwise the bundled copy.
pub fn resolve_or_bundled(preferred: &Path, bundled: PathBuf) -> PathBuf {
    if preferred.is_absolute() || preferred.exists() { preferred.to_path_buf() } else { bundled }
}
