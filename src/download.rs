//! Dataset download: fetch the published CSV archive into the CSV directory
//! and unpack it over whatever CSV files were there.
//!
//! The archive is fetched before anything is cleared, so a failed download
//! leaves the previous files in place.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{F1dbError, F1dbResult};

/// Name of the archive while it sits in the CSV directory.
pub const ARCHIVE_FILE_NAME: &str = "f1db.zip";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub bytes: u64,
    /// CSV files removed before unpacking.
    pub removed: usize,
    pub extracted: usize,
}

/// Download `config.download_url`, replace the CSV files in `config.csv_dir`
/// with the archive's contents and delete the archive.
pub fn download_dataset(config: &Config) -> F1dbResult<DownloadReport> {
    let dir = &config.csv_dir;
    fs::create_dir_all(dir)?;
    let archive = dir.join(ARCHIVE_FILE_NAME);

    info!(url = %config.download_url, "downloading csv archive");
    let bytes = fetch_to_file(&config.download_url, &archive)?;
    info!(bytes, "download complete");

    let removed = clear_csv_files(dir)?;
    let extracted = extract_archive(&archive, dir);
    debug!(path = %archive.display(), "removing archive");
    fs::remove_file(&archive)?;
    let extracted = extracted?;
    info!(removed, extracted, dir = %dir.display(), "csv files replaced");
    Ok(DownloadReport { bytes, removed, extracted })
}

fn fetch_to_file(url: &str, path: &Path) -> F1dbResult<u64> {
    let err = |source| F1dbError::Download { url: url.to_string(), source };
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("f1db/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(600))
        .build()
        .map_err(err)?;
    let mut resp = client.get(url).send().and_then(|r| r.error_for_status()).map_err(err)?;
    let mut out = BufWriter::new(File::create(path)?);
    let bytes = resp.copy_to(&mut out).map_err(err)?;
    out.flush()?;
    Ok(bytes)
}

/// Delete every `*.csv` file directly inside `dir`. A missing directory has
/// nothing to clear.
pub fn clear_csv_files(dir: &Path) -> F1dbResult<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for ent in fs::read_dir(dir)? {
        let p = ent?.path();
        let is_csv = p.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false);
        if p.is_file() && is_csv {
            fs::remove_file(&p)?;
            removed += 1;
        }
    }
    debug!(removed, dir = %dir.display(), "cleared csv files");
    Ok(removed)
}

/// Unpack every entry of the zip at `archive` under `dir`; returns the number
/// of files written. Entries that would land outside `dir` are rejected.
pub fn extract_archive(archive: &Path, dir: &Path) -> F1dbResult<usize> {
    let err = |source| F1dbError::Archive { path: archive.to_path_buf(), source };
    let mut zip = zip::ZipArchive::new(File::open(archive)?).map_err(err)?;
    zip.extract(dir).map_err(err)?;
    Ok(zip.file_names().filter(|n| !n.ends_with('/')).count())
}
