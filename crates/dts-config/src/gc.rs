use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::info;

/// Delete CKG database files under `ckg_dir` not accessed within
/// `retention`. Spec.md §4.6 "CKG housekeeping". Uses mtime as the access
/// proxy (every `sync_codebase` / `on_file_changed` touches the file).
pub fn sweep_stale_ckg_databases(ckg_dir: &Path, retention: Duration) -> Result<Vec<String>> {
    if !ckg_dir.exists() {
        return Ok(Vec::new());
    }

    let now = SystemTime::now();
    let mut removed = Vec::new();

    for entry in std::fs::read_dir(ckg_dir)
        .with_context(|| format!("reading ckg directory {}", ckg_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sqlite") {
            continue;
        }
        let metadata = entry.metadata()?;
        let modified = metadata.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > retention {
            std::fs::remove_file(&path)
                .with_context(|| format!("removing stale ckg db {}", path.display()))?;
            info!(path = %path.display(), age_secs = age.as_secs(), "swept stale ckg database");
            removed.push(path.display().to_string());
        }
    }

    Ok(removed)
}
