//! Code Knowledge Graph: a per-project-root SQLite index of function, method,
//! and class definitions, kept in sync by content hash. See spec.md §4.6.

pub mod entries;
mod extractors;
mod schema;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dts_core::{FileChangeNotifier, ToolError, ToolResult};
use rusqlite::{Connection, params};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub use entries::{ClassEntry, ClassHit, FunctionEntry, FunctionHit};

const HIDDEN_PREFIX: char = '.';

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Hash the canonical project root to a stable database filename.
pub fn db_path_for_root(storage_dir: &Path, root: &Path) -> PathBuf {
    let digest = md5::compute(root.to_string_lossy().as_bytes());
    storage_dir.join("ckg").join(format!("{digest:x}.sqlite"))
}

fn is_hidden_component(component: &std::path::Component) -> bool {
    component
        .as_os_str()
        .to_str()
        .is_some_and(|s| s.starts_with(HIDDEN_PREFIX))
}

fn is_indexable(relative: &Path) -> bool {
    if relative.components().any(|c| is_hidden_component(&c)) {
        return false;
    }
    let Some(ext) = relative.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extractors::extractor_for_extension(ext).is_some()
}

fn file_md5(path: &Path) -> ToolResult<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| ToolError::Internal(format!("reading {}: {e}", path.display())))?;
    Ok(format!("{:x}", md5::compute(bytes)))
}

/// A persistent code index for one project root, shared by every session
/// whose `root` resolves to the same path.
pub struct CkgIndex {
    root: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl CkgIndex {
    pub async fn open(root: PathBuf, storage_dir: &Path) -> ToolResult<Self> {
        let db_path = db_path_for_root(storage_dir, &root);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::DbError(format!("creating {}: {e}", parent.display())))?;
        }

        let conn = tokio::task::spawn_blocking(move || -> rusqlite::Result<Connection> {
            let conn = Connection::open(&db_path)?;
            schema::apply(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| ToolError::DbError(format!("opening ckg db: {e}")))?
        .map_err(|e| ToolError::DbError(format!("opening ckg db: {e}")))?;

        let index = Self {
            root,
            conn: Arc::new(Mutex::new(conn)),
        };
        index.sync_codebase().await?;
        Ok(index)
    }

    async fn run_blocking<F, R>(&self, f: F) -> ToolResult<R>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.blocking_lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| ToolError::DbError(format!("ckg task join error: {e}")))?
        .map_err(|e| ToolError::DbError(e.to_string()))
    }

    fn relative_path(&self, file: &Path) -> String {
        file.strip_prefix(&self.root)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned()
    }

    /// Enumerate indexable files on disk, compare against `file_hashes`, and
    /// reindex anything new, changed, or deleted.
    pub async fn sync_codebase(&self) -> ToolResult<SyncStats> {
        let root = self.root.clone();
        let on_disk: Vec<(String, String)> = tokio::task::spawn_blocking(move || {
            walkdir::WalkDir::new(&root)
                .into_iter()
                .filter_entry(|e| {
                    e.path() == root || !is_hidden_component(&e.path().components().last().unwrap())
                })
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| {
                    let relative = e.path().strip_prefix(&root).ok()?.to_path_buf();
                    is_indexable(&relative).then(|| (e.path().to_path_buf(), relative))
                })
                .filter_map(|(abs, relative)| {
                    let hash = file_md5(&abs).ok()?;
                    Some((relative.to_string_lossy().into_owned(), hash))
                })
                .collect()
        })
        .await
        .map_err(|e| ToolError::Internal(format!("walking project root: {e}")))?;

        let known: Vec<(String, String)> = self
            .run_blocking(|conn| {
                let mut stmt = conn.prepare("SELECT file_path, hash FROM file_hashes")?;
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect()
            })
            .await?;

        let mut stats = SyncStats::default();
        let known_map: std::collections::HashMap<_, _> = known.into_iter().collect();

        for (relative, hash) in &on_disk {
            match known_map.get(relative) {
                Some(existing) if existing == hash => stats.unchanged += 1,
                _ => {
                    self.on_file_changed(&self.root.join(relative)).await?;
                    stats.updated += 1;
                }
            }
        }

        let on_disk_paths: std::collections::HashSet<_> =
            on_disk.iter().map(|(p, _)| p.clone()).collect();
        for relative in known_map.keys() {
            if !on_disk_paths.contains(relative) {
                self.remove_file(&self.root.join(relative)).await?;
                stats.removed += 1;
            }
        }

        debug!(?stats, "ckg sync_codebase complete");
        Ok(stats)
    }

    /// Atomically reindex one file: delete its old rows, parse it fresh,
    /// insert the new rows, and upsert its hash.
    pub async fn on_file_changed(&self, file: &Path) -> ToolResult<()> {
        let relative = self.relative_path(file);
        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(extractor) = extractors::extractor_for_extension(&extension) else {
            return Ok(());
        };

        let source = match std::fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %relative, "skipping ckg reindex, unreadable: {e}");
                return Ok(());
            }
        };
        let hash = file_md5(file)?;
        let extracted = extractor.extract(&relative, &source);

        self.run_blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM functions WHERE file_path = ?1",
                params![relative],
            )?;
            tx.execute("DELETE FROM classes WHERE file_path = ?1", params![relative])?;

            for f in &extracted.functions {
                tx.execute(
                    "INSERT INTO functions (name, file_path, body, start_line, end_line, parent_function, parent_class)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![f.name, f.file_path, f.body, f.start_line as i64, f.end_line as i64, f.parent_function, f.parent_class],
                )?;
            }
            for c in &extracted.classes {
                tx.execute(
                    "INSERT INTO classes (name, file_path, body, start_line, end_line, fields, methods)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![c.name, c.file_path, c.body, c.start_line as i64, c.end_line as i64, c.fields, c.methods],
                )?;
            }

            tx.execute(
                "INSERT INTO file_hashes (file_path, hash) VALUES (?1, ?2)
                 ON CONFLICT(file_path) DO UPDATE SET hash = excluded.hash",
                params![relative, hash],
            )?;
            tx.commit()
        })
        .await
    }

    /// Remove every row associated with `file` (the file no longer exists,
    /// or is no longer indexable).
    pub async fn remove_file(&self, file: &Path) -> ToolResult<()> {
        let relative = self.relative_path(file);
        self.run_blocking(move |conn| {
            conn.execute("DELETE FROM functions WHERE file_path = ?1", params![relative])?;
            conn.execute("DELETE FROM classes WHERE file_path = ?1", params![relative])?;
            conn.execute(
                "DELETE FROM file_hashes WHERE file_path = ?1",
                params![relative],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn search_function(&self, identifier: &str) -> ToolResult<Vec<FunctionHit>> {
        let identifier = identifier.to_string();
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, file_path, start_line, end_line, parent_class, body
                 FROM functions WHERE name = ?1 AND parent_class IS NULL",
            )?;
            stmt.query_map(params![identifier], row_to_function_hit)?
                .collect()
        })
        .await
    }

    pub async fn search_class(&self, identifier: &str) -> ToolResult<Vec<ClassHit>> {
        let identifier = identifier.to_string();
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, file_path, start_line, end_line, body FROM classes WHERE name = ?1",
            )?;
            stmt.query_map(params![identifier], |row| {
                Ok(ClassHit {
                    name: row.get(0)?,
                    file_path: row.get(1)?,
                    start_line: row.get::<_, i64>(2)? as usize,
                    end_line: row.get::<_, i64>(3)? as usize,
                    body: row.get(4)?,
                })
            })?
            .collect()
        })
        .await
    }

    pub async fn search_class_method(&self, identifier: &str) -> ToolResult<Vec<FunctionHit>> {
        let identifier = identifier.to_string();
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, file_path, start_line, end_line, parent_class, body
                 FROM functions WHERE name = ?1 AND parent_class IS NOT NULL",
            )?;
            stmt.query_map(params![identifier], row_to_function_hit)?
                .collect()
        })
        .await
    }
}

fn row_to_function_hit(row: &rusqlite::Row) -> rusqlite::Result<FunctionHit> {
    Ok(FunctionHit {
        name: row.get(0)?,
        file_path: row.get(1)?,
        start_line: row.get::<_, i64>(2)? as usize,
        end_line: row.get::<_, i64>(3)? as usize,
        parent_class: row.get(4)?,
        body: row.get(5)?,
    })
}

#[async_trait]
impl FileChangeNotifier for CkgIndex {
    async fn on_file_changed(&self, path: &Path) {
        if let Err(e) = CkgIndex::on_file_changed(self, path).await {
            warn!(path = %path.display(), "ckg reindex failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn index_for(root: &Path) -> CkgIndex {
        let storage = root.join(".storage");
        CkgIndex::open(root.to_path_buf(), &storage).await.unwrap()
    }

    #[tokio::test]
    async fn sync_codebase_indexes_new_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("mod.py"),
            "def greet():\n    return 1\n",
        )
        .unwrap();

        let index = index_for(temp.path()).await;
        let hits = index.search_function("greet").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "mod.py");
    }

    #[tokio::test]
    async fn on_file_changed_replaces_old_rows() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("mod.py");
        std::fs::write(&file, "def a():\n    pass\n").unwrap();
        let index = index_for(temp.path()).await;
        assert_eq!(index.search_function("a").await.unwrap().len(), 1);

        std::fs::write(&file, "def b():\n    pass\n").unwrap();
        index.on_file_changed(&file).await.unwrap();

        assert!(index.search_function("a").await.unwrap().is_empty());
        assert_eq!(index.search_function("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_file_clears_all_rows() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("mod.py");
        std::fs::write(&file, "def a():\n    pass\n").unwrap();
        let index = index_for(temp.path()).await;
        assert_eq!(index.search_function("a").await.unwrap().len(), 1);

        index.remove_file(&file).await.unwrap();
        assert!(index.search_function("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_class_method_requires_parent_class() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("mod.py"),
            "class Greeter:\n    def hello(self):\n        pass\n\n\ndef hello():\n    pass\n",
        )
        .unwrap();
        let index = index_for(temp.path()).await;

        let methods = index.search_class_method("hello").await.unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].parent_class.as_deref(), Some("Greeter"));

        let functions = index.search_function("hello").await.unwrap();
        assert_eq!(functions.len(), 1);
        assert!(functions[0].parent_class.is_none());
    }

    #[tokio::test]
    async fn hidden_directories_are_not_indexed() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git/hook.py"), "def hidden():\n    pass\n").unwrap();

        let index = index_for(temp.path()).await;
        assert!(index.search_function("hidden").await.unwrap().is_empty());
    }
}
