//! Per-session state: the sandbox root/cwd, phase, the persistent shell (once
//! started), a handle to the project's CKG index, and the thought log.
//! See spec.md §3, §4.1.

use std::path::PathBuf;
use std::sync::Arc;

use dts_ckg::CkgIndex;
use dts_core::Phase;
use dts_shell::PersistentShell;

use crate::thinking::ThoughtLog;

pub struct SessionState {
    pub root: PathBuf,
    pub cwd: PathBuf,
    pub phase: Phase,
    pub shell: Option<PersistentShell>,
    pub ckg: Option<Arc<CkgIndex>>,
    pub thoughts: ThoughtLog,
}

impl SessionState {
    pub fn new(root: PathBuf) -> Self {
        Self {
            cwd: root.clone(),
            root,
            phase: Phase::Discovery,
            shell: None,
            ckg: None,
            thoughts: ThoughtLog::default(),
        }
    }

    /// Move into the Edit phase and fix `cwd` going forward. Monotonic: a
    /// session already in Edit stays there.
    pub fn lock_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
        self.phase.lock();
    }
}
