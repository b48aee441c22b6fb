use std::path::PathBuf;

/// XDG app name used to resolve the default storage directory.
pub const APP_NAME: &str = "dev-tools-mcp";

/// Resolve the default storage directory (`STORAGE_DIR` env override wins).
///
/// Falls back to the platform state directory via `directories::ProjectDirs`,
/// then to `./.dev-tools-mcp` if no home directory can be determined (e.g.
/// inside a minimal container).
pub fn default_storage_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STORAGE_DIR") {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".dev-tools-mcp"))
}

/// Directory holding one SQLite CKG database per indexed project root.
pub fn ckg_dir(storage_dir: &std::path::Path) -> PathBuf {
    storage_dir.join("ckg")
}
