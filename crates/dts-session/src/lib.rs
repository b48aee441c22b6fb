//! Session registry: a concurrent map from session id to its state, plus a
//! shared, per-root table of CKG index handles so sessions that point at the
//! same project don't each open their own SQLite database. See spec.md §3.

pub mod state;
pub mod thinking;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dts_ckg::CkgIndex;
use dts_core::ToolResult;
use tokio::sync::Mutex;
use tracing::debug;

pub use state::SessionState;
pub use thinking::{AppendResult, ThoughtLog, ThoughtRecord};

/// A registry shared across every in-flight MCP connection. Sessions are
/// created lazily on first reference, rooted at `default_root`.
pub struct SessionStore {
    default_root: PathBuf,
    storage_dir: PathBuf,
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
    ckg_handles: DashMap<PathBuf, Arc<CkgIndex>>,
}

impl SessionStore {
    pub fn new(default_root: PathBuf, storage_dir: PathBuf) -> Self {
        Self {
            default_root,
            storage_dir,
            sessions: DashMap::new(),
            ckg_handles: DashMap::new(),
        }
    }

    /// Fetch or lazily create the named session, rooted at this store's
    /// configured default root.
    pub fn session(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        if !self.sessions.contains_key(session_id) {
            debug!(session_id, "creating session");
        }
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(self.default_root.clone()))))
            .clone()
    }

    pub fn close(&self, session_id: &str) {
        debug!(session_id, "closing session");
        self.sessions.remove(session_id);
    }

    /// Fetch or open the CKG index for `root`, sharing one handle across
    /// every session pointed at the same project. Two concurrent first
    /// references to a cold root may each pay the open cost once; the loser
    /// discards its handle, which is harmless since SQLite serializes the
    /// underlying writes.
    pub async fn ckg_for(&self, root: &Path) -> ToolResult<Arc<CkgIndex>> {
        if let Some(existing) = self.ckg_handles.get(root) {
            return Ok(existing.clone());
        }
        let index = Arc::new(CkgIndex::open(root.to_path_buf(), &self.storage_dir).await?);
        self.ckg_handles
            .insert(root.to_path_buf(), index.clone());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_is_created_lazily_and_reused() {
        let store = SessionStore::new(PathBuf::from("/sandbox"), PathBuf::from("/tmp/dts-store"));
        let a = store.session("s1");
        let b = store.session("s1");
        assert!(Arc::ptr_eq(&a, &b));

        let c = store.session("s2");
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn ckg_handle_is_shared_across_sessions_at_the_same_root() {
        let temp = tempfile::tempdir().unwrap();
        let storage = temp.path().join(".storage");
        let store = SessionStore::new(temp.path().to_path_buf(), storage);

        let first = store.ckg_for(temp.path()).await.unwrap();
        let second = store.ckg_for(temp.path()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn close_drops_the_session_handle() {
        let store = SessionStore::new(PathBuf::from("/sandbox"), PathBuf::from("/tmp/dts-store"));
        let _ = store.session("s1");
        store.close("s1");
        assert_eq!(store.sessions.len(), 0);
    }
}
