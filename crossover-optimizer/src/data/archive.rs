use std::fs::{self, File};
use std::path::{Path, PathBuf};

use common::{BacktestError, Result};
use tracing::debug;
use zip::ZipArchive;

/// Extract every entry of `archive_path` into `dest`, creating it if needed.
/// Existing files with the same names are overwritten.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path).map_err(|e| {
        BacktestError::ArchiveError(format!("{}: {}", archive_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| BacktestError::ArchiveError(format!("{}: {}", archive_path.display(), e)))?;

    fs::create_dir_all(dest)?;
    archive
        .extract(dest)
        .map_err(|e| BacktestError::ArchiveError(e.to_string()))?;

    debug!(entries = archive.len(), dest = %dest.display(), "archive extracted");
    Ok(archive.len())
}

/// Recursively collect files ending in `.csv` under `root`
pub fn discover_csv_files(root: &Path, sort: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(root, &mut found)?;
    if sort {
        found.sort();
    }
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, found)?;
        } else if is_csv(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}
