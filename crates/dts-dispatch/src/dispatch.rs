//! Transport-agnostic Tool Dispatcher: phase gating, path resolution, and
//! engine invocation for every MCP tool. See SPEC_FULL.md §4.9.

use std::path::Path;
use std::sync::Arc;

use dts_ckg::{CkgIndex, ClassHit, FunctionHit};
use dts_config::ServerConfig;
use dts_core::{Phase, TRUNCATION_MARKER, ToolError, ToolOutcome, ToolResult, truncate_bytes};
use dts_session::{SessionState, SessionStore};
use dts_shell::PersistentShell;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::params::{
    BashArgs, CodeSearchArgs, FileEditorArgs, GitDiffArgs, JsonEditorArgs, NavigatorArgs,
    SequentialThinkingArgs,
};

fn outcome<T: Serialize>(result: ToolResult<T>) -> ToolOutcome {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(v) => ToolOutcome::ok(v),
            Err(e) => ToolOutcome::err("Internal", format!("serializing result: {e}")),
        },
        Err(e) => e.into(),
    }
}

fn ensure_edit_phase(phase: Phase, tool: &str) -> ToolResult<()> {
    if phase == Phase::Edit {
        Ok(())
    } else {
        Err(ToolError::PhaseViolation {
            tool: tool.to_string(),
            phase: phase.to_string(),
        })
    }
}

fn render_function_hits(hits: Vec<FunctionHit>, print_body: bool, max_bytes: usize) -> Value {
    let rendered: Vec<Value> = hits
        .into_iter()
        .map(|h| {
            let mut entry = json!({
                "name": h.name,
                "file_path": h.file_path,
                "start_line": h.start_line,
                "end_line": h.end_line,
                "parent_class": h.parent_class,
            });
            if print_body {
                if let Some(body) = &h.body {
                    let (mut body, truncated) = truncate_bytes(body, max_bytes);
                    if truncated {
                        body.push_str(TRUNCATION_MARKER);
                    }
                    entry["body"] = json!(body);
                    entry["body_truncated"] = json!(truncated);
                }
            }
            entry
        })
        .collect();
    json!({ "hits": rendered })
}

fn render_class_hits(hits: Vec<ClassHit>, print_body: bool, max_bytes: usize) -> Value {
    let rendered: Vec<Value> = hits
        .into_iter()
        .map(|h| {
            let mut entry = json!({
                "name": h.name,
                "file_path": h.file_path,
                "start_line": h.start_line,
                "end_line": h.end_line,
            });
            if print_body {
                if let Some(body) = &h.body {
                    let (mut body, truncated) = truncate_bytes(body, max_bytes);
                    if truncated {
                        body.push_str(TRUNCATION_MARKER);
                    }
                    entry["body"] = json!(body);
                    entry["body_truncated"] = json!(truncated);
                }
            }
            entry
        })
        .collect();
    json!({ "hits": rendered })
}

/// Routes typed tool calls to the Path Sandbox, Shell, Edit, JSON, CKG, and
/// Git engines, enforcing the phase-gating table of SPEC_FULL.md §4.1.
pub struct Dispatcher {
    config: Arc<ServerConfig>,
    sessions: Arc<SessionStore>,
}

impl Dispatcher {
    pub fn new(config: Arc<ServerConfig>, sessions: Arc<SessionStore>) -> Self {
        Self { config, sessions }
    }

    async fn ckg_for(&self, root: &Path) -> ToolResult<Arc<CkgIndex>> {
        self.sessions.ckg_for(root).await
    }

    pub async fn navigator(&self, session_id: &str, args: NavigatorArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        outcome(self.navigator_inner(&mut state, args).await)
    }

    async fn navigator_inner(&self, state: &mut SessionState, args: NavigatorArgs) -> ToolResult<Value> {
        match args.subcommand.as_str() {
            "pwd" => Ok(json!({ "cwd": state.cwd.display().to_string() })),
            "cd" => {
                let target = args
                    .path
                    .as_deref()
                    .ok_or_else(|| ToolError::BadArguments("cd requires 'path'".to_string()))?;
                let resolved = dts_sandbox::resolve(&state.root, &state.cwd, target)?;
                if !resolved.is_dir() {
                    return Err(ToolError::NotADirectory(resolved.display().to_string()));
                }
                state.cwd = resolved.clone();
                Ok(json!({ "cwd": resolved.display().to_string() }))
            }
            "ls" => {
                let target = args.path.as_deref().unwrap_or(".");
                let resolved = dts_sandbox::resolve(&state.root, &state.cwd, target)?;
                match dts_edit::view(&resolved, None, self.config.output_max_bytes)? {
                    dts_edit::ViewResult::Directory { entries } => Ok(json!({ "entries": entries })),
                    dts_edit::ViewResult::File { .. } => {
                        Err(ToolError::NotADirectory(resolved.display().to_string()))
                    }
                }
            }
            "read" => {
                let target = args
                    .path
                    .as_deref()
                    .ok_or_else(|| ToolError::BadArguments("read requires 'path'".to_string()))?;
                let resolved = dts_sandbox::resolve(&state.root, &state.cwd, target)?;
                match dts_edit::view(&resolved, args.view_range, self.config.output_max_bytes)? {
                    dts_edit::ViewResult::File { content, truncated } => {
                        Ok(json!({ "content": content, "truncated": truncated }))
                    }
                    dts_edit::ViewResult::Directory { entries } => Ok(json!({ "entries": entries })),
                }
            }
            "lock_cwd" => {
                let target_cwd = match &args.path {
                    Some(p) => dts_sandbox::resolve(&state.root, &state.cwd, p)?,
                    None => state.cwd.clone(),
                };
                state.lock_cwd(target_cwd.clone());
                info!(cwd = %target_cwd.display(), "locked cwd, entering edit phase");
                Ok(json!({ "phase": state.phase.as_str(), "cwd": target_cwd.display().to_string() }))
            }
            other => Err(ToolError::BadArguments(format!(
                "unknown navigator subcommand '{other}'"
            ))),
        }
    }

    pub async fn bash(&self, session_id: &str, args: BashArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        outcome(self.bash_inner(&mut state, args).await)
    }

    async fn bash_inner(&self, state: &mut SessionState, args: BashArgs) -> ToolResult<Value> {
        ensure_edit_phase(state.phase, "bash")?;
        let restart = args.restart.unwrap_or(false);
        if args.command.is_none() && !restart {
            return Err(ToolError::BadArguments(
                "bash requires 'command' or 'restart'".to_string(),
            ));
        }

        if state.shell.is_none() {
            state.shell = Some(PersistentShell::spawn()?);
        }
        let shell = state.shell.as_mut().expect("shell just ensured");

        if restart {
            shell.restart().await?;
            if args.command.is_none() {
                return Ok(json!({ "restarted": true }));
            }
        }

        let command = args.command.as_deref().unwrap_or_default();
        let cwd = state.cwd.clone();
        let result = shell
            .run(
                command,
                &cwd,
                self.config.shell_timeout,
                self.config.output_max_bytes,
            )
            .await?;
        Ok(json!({
            "stdout": result.stdout,
            "stderr": result.stderr,
            "exit_code": result.exit_code,
            "stdout_truncated": result.stdout_truncated,
            "stderr_truncated": result.stderr_truncated,
        }))
    }

    pub async fn file_editor(&self, session_id: &str, args: FileEditorArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        outcome(self.file_editor_inner(&mut state, args).await)
    }

    async fn file_editor_inner(&self, state: &mut SessionState, args: FileEditorArgs) -> ToolResult<Value> {
        match args.operation.as_str() {
            "view" => {
                let resolved = dts_sandbox::resolve(&state.root, &state.cwd, &args.path)?;
                match dts_edit::view(&resolved, args.view_range, self.config.output_max_bytes)? {
                    dts_edit::ViewResult::File { content, truncated } => {
                        Ok(json!({ "content": content, "truncated": truncated }))
                    }
                    dts_edit::ViewResult::Directory { entries } => Ok(json!({ "entries": entries })),
                }
            }
            "create" => {
                ensure_edit_phase(state.phase, "file_editor.create")?;
                let contents = args.file_text.clone().unwrap_or_default();
                let resolved = dts_sandbox::resolve_for_create(&state.root, &state.cwd, &args.path)?;
                let ckg = self.ckg_for(&state.root).await?;
                dts_edit::create(&resolved, &contents, ckg.as_ref()).await?;
                Ok(json!({ "path": resolved.display().to_string() }))
            }
            "replace" => {
                ensure_edit_phase(state.phase, "file_editor.replace")?;
                let old_str = args
                    .old_str
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("replace requires 'old_str'".to_string()))?;
                let new_str = args.new_str.clone().unwrap_or_default();
                let resolved = dts_sandbox::resolve(&state.root, &state.cwd, &args.path)?;
                let ckg = self.ckg_for(&state.root).await?;
                let snippet = dts_edit::replace(&resolved, &old_str, &new_str, ckg.as_ref()).await?;
                Ok(json!({
                    "snippet": snippet.text,
                    "start_line": snippet.start_line,
                    "end_line": snippet.end_line,
                }))
            }
            "insert" => {
                ensure_edit_phase(state.phase, "file_editor.insert")?;
                let new_str = args
                    .new_str
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("insert requires 'new_str'".to_string()))?;
                let after_line = args.insert_line.unwrap_or(0).max(0) as usize;
                let resolved = dts_sandbox::resolve(&state.root, &state.cwd, &args.path)?;
                let ckg = self.ckg_for(&state.root).await?;
                let snippet = dts_edit::insert(&resolved, after_line, &new_str, ckg.as_ref()).await?;
                Ok(json!({
                    "snippet": snippet.text,
                    "start_line": snippet.start_line,
                    "end_line": snippet.end_line,
                }))
            }
            other => Err(ToolError::BadArguments(format!(
                "unknown file_editor operation '{other}'"
            ))),
        }
    }

    pub async fn json_editor(&self, session_id: &str, args: JsonEditorArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        outcome(self.json_editor_inner(&mut state, args).await)
    }

    async fn json_editor_inner(&self, state: &mut SessionState, args: JsonEditorArgs) -> ToolResult<Value> {
        let resolved = dts_sandbox::resolve(&state.root, &state.cwd, &args.file_path)?;
        match args.operation.as_str() {
            "view" => {
                let doc = dts_json::load(&resolved)?;
                let matches = dts_json::view(&doc, args.json_path.as_deref())?;
                let rendered: Vec<Value> = matches
                    .into_iter()
                    .map(|m| json!({ "path": m.path, "value": m.value }))
                    .collect();
                Ok(json!({ "matches": rendered }))
            }
            "set" => {
                ensure_edit_phase(state.phase, "json_editor.set")?;
                let path_expr = args
                    .json_path
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("set requires 'json_path'".to_string()))?;
                let value = args
                    .value
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("set requires 'value'".to_string()))?;
                let ckg = self.ckg_for(&state.root).await?;
                let pretty_print = args.pretty_print.unwrap_or(false);
                let count =
                    dts_json::set(&resolved, &path_expr, value, pretty_print, ckg.as_ref()).await?;
                Ok(json!({ "matched": count }))
            }
            "add" => {
                ensure_edit_phase(state.phase, "json_editor.add")?;
                let path_expr = args
                    .json_path
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("add requires 'json_path'".to_string()))?;
                let value = args
                    .value
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("add requires 'value'".to_string()))?;
                let ckg = self.ckg_for(&state.root).await?;
                let pretty_print = args.pretty_print.unwrap_or(false);
                dts_json::add(&resolved, &path_expr, value, pretty_print, ckg.as_ref()).await?;
                Ok(json!({ "ok": true }))
            }
            "remove" => {
                ensure_edit_phase(state.phase, "json_editor.remove")?;
                let path_expr = args
                    .json_path
                    .clone()
                    .ok_or_else(|| ToolError::BadArguments("remove requires 'json_path'".to_string()))?;
                let ckg = self.ckg_for(&state.root).await?;
                let pretty_print = args.pretty_print.unwrap_or(false);
                let count =
                    dts_json::remove(&resolved, &path_expr, pretty_print, ckg.as_ref()).await?;
                Ok(json!({ "removed": count }))
            }
            other => Err(ToolError::BadArguments(format!(
                "unknown json_editor operation '{other}'"
            ))),
        }
    }

    pub async fn code_search(&self, session_id: &str, args: CodeSearchArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let state = session.lock().await;
        outcome(self.code_search_inner(&state, args).await)
    }

    async fn code_search_inner(&self, state: &SessionState, args: CodeSearchArgs) -> ToolResult<Value> {
        let resolved = dts_sandbox::resolve(&state.root, &state.cwd, &args.path)?;
        if !resolved.is_dir() {
            return Err(ToolError::NotADirectory(resolved.display().to_string()));
        }
        let ckg = self.ckg_for(&resolved).await?;
        let print_body = args.print_body.unwrap_or(false);
        let max_bytes = self.config.output_max_bytes;

        match args.command.as_str() {
            "search_function" => {
                let hits = ckg.search_function(&args.identifier).await?;
                Ok(render_function_hits(hits, print_body, max_bytes))
            }
            "search_class" => {
                let hits = ckg.search_class(&args.identifier).await?;
                Ok(render_class_hits(hits, print_body, max_bytes))
            }
            "search_class_method" => {
                let hits = ckg.search_class_method(&args.identifier).await?;
                Ok(render_function_hits(hits, print_body, max_bytes))
            }
            other => Err(ToolError::BadArguments(format!(
                "unknown code_search command '{other}'"
            ))),
        }
    }

    pub async fn git_diff(&self, session_id: &str, args: GitDiffArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let state = session.lock().await;
        outcome(self.git_diff_inner(&state, args))
    }

    fn git_diff_inner(&self, state: &SessionState, args: GitDiffArgs) -> ToolResult<Value> {
        let resolved = dts_sandbox::resolve(&state.root, &state.cwd, &args.path)?;
        let diff = dts_git::diff(
            &resolved,
            args.base_commit.as_deref(),
            args.filter_tests.unwrap_or(false),
        )?;
        Ok(json!({ "diff": diff }))
    }

    pub async fn sequential_thinking(&self, session_id: &str, args: SequentialThinkingArgs) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        let result = state.thoughts.append(args).map(|r| {
            json!({
                "appended_index": r.appended_index,
                "branches": r.branches,
                "history_length": r.history_length,
            })
        });
        outcome(result)
    }

    pub async fn task_done(&self, session_id: &str) -> ToolOutcome {
        let session = self.sessions.session(session_id);
        let state = session.lock().await;
        ToolOutcome::ok(json!({
            "phase": state.phase.as_str(),
            "thoughts_recorded": state.thoughts.history().len(),
        }))
    }
}
