//! Tool Dispatcher: the single place phase gating, path resolution, and
//! engine wiring come together. A transport (MCP stdio/HTTP, or a test
//! harness) only needs to deserialize arguments and call these methods.

mod dispatch;
pub mod params;

pub use dispatch::Dispatcher;
pub use params::{
    BashArgs, CodeSearchArgs, FileEditorArgs, GitDiffArgs, JsonEditorArgs, NavigatorArgs,
    SequentialThinkingArgs,
};

#[cfg(test)]
mod tests {
    use super::*;
    use dts_config::ServerConfig;
    use dts_session::SessionStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn dispatcher(root: &std::path::Path) -> Dispatcher {
        let config = Arc::new(ServerConfig {
            sandbox_root: root.to_path_buf(),
            storage_dir: root.join(".storage"),
            ckg_retention_days: 30,
            shell_timeout: Duration::from_secs(5),
            output_max_bytes: 1 << 20,
            transport: dts_config::Transport::Stdio,
            host: "127.0.0.1".to_string(),
            port: 8787,
        });
        let sessions = Arc::new(SessionStore::new(
            root.to_path_buf(),
            config.storage_dir.clone(),
        ));
        Dispatcher::new(config, sessions)
    }

    fn assert_ok(outcome: &dts_core::ToolOutcome) -> &serde_json::Value {
        assert!(outcome.success, "expected success, got {outcome:?}");
        &outcome.content
    }

    fn assert_err(outcome: &dts_core::ToolOutcome, code: &str) {
        assert!(!outcome.success, "expected failure, got {outcome:?}");
        assert_eq!(outcome.error_code, Some(code));
    }

    // S1: navigating around the sandbox and rejecting an escape.
    #[tokio::test]
    async fn s1_cd_and_pwd_and_escape() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        let dispatcher = dispatcher(&root);

        let out = dispatcher
            .navigator(
                "s1",
                NavigatorArgs {
                    subcommand: "cd".to_string(),
                    path: Some("src".to_string()),
                    view_range: None,
                },
            )
            .await;
        assert_ok(&out);

        let out = dispatcher
            .navigator(
                "s1",
                NavigatorArgs {
                    subcommand: "pwd".to_string(),
                    path: None,
                    view_range: None,
                },
            )
            .await;
        let content = assert_ok(&out);
        assert_eq!(content["cwd"], root.join("src").display().to_string().into());

        let out = dispatcher
            .navigator(
                "s1",
                NavigatorArgs {
                    subcommand: "cd".to_string(),
                    path: Some("../..".to_string()),
                    view_range: None,
                },
            )
            .await;
        assert_err(&out, "PathEscape");
    }

    // S2: locking cwd transitions to Edit, then bash runs.
    #[tokio::test]
    async fn s2_lock_cwd_then_bash() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let dispatcher = dispatcher(&root);

        let denied = dispatcher
            .bash(
                "s2",
                BashArgs {
                    command: Some("echo hi".to_string()),
                    restart: None,
                },
            )
            .await;
        assert_err(&denied, "PhaseViolation");

        let locked = dispatcher
            .navigator(
                "s2",
                NavigatorArgs {
                    subcommand: "lock_cwd".to_string(),
                    path: None,
                    view_range: None,
                },
            )
            .await;
        assert_ok(&locked);

        let out = dispatcher
            .bash(
                "s2",
                BashArgs {
                    command: Some("echo hi".to_string()),
                    restart: None,
                },
            )
            .await;
        let content = assert_ok(&out);
        assert_eq!(content["stdout"], "hi".into());
        assert_eq!(content["exit_code"], 0.into());
    }

    // S3: replace against a non-unique match reports every matching line.
    #[tokio::test]
    async fn s3_replace_reports_not_unique() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::write(root.join("a.py"), "def f(): return 1\ndef f(): return 1\n").unwrap();
        let dispatcher = dispatcher(&root);
        dispatcher
            .navigator(
                "s3",
                NavigatorArgs {
                    subcommand: "lock_cwd".to_string(),
                    path: None,
                    view_range: None,
                },
            )
            .await;

        let out = dispatcher
            .file_editor(
                "s3",
                FileEditorArgs {
                    operation: "replace".to_string(),
                    path: "a.py".to_string(),
                    file_text: None,
                    old_str: Some("return 1".to_string()),
                    new_str: Some("return 2".to_string()),
                    insert_line: None,
                    view_range: None,
                },
            )
            .await;
        assert_err(&out, "NotUnique");
    }

    // S4: json_editor add then remove on a fresh array.
    #[tokio::test]
    async fn s4_json_add_then_remove() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::write(root.join("x.json"), r#"{"a":[1,2]}"#).unwrap();
        let dispatcher = dispatcher(&root);
        dispatcher
            .navigator(
                "s4",
                NavigatorArgs {
                    subcommand: "lock_cwd".to_string(),
                    path: None,
                    view_range: None,
                },
            )
            .await;

        let out = dispatcher
            .json_editor(
                "s4",
                JsonEditorArgs {
                    operation: "add".to_string(),
                    file_path: "x.json".to_string(),
                    json_path: Some("$.a".to_string()),
                    value: Some(serde_json::json!(3)),
                    pretty_print: None,
                },
            )
            .await;
        assert_ok(&out);
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(root.join("x.json")).unwrap()).unwrap();
        assert_eq!(doc["a"], serde_json::json!([1, 2, 3]));

        let out = dispatcher
            .json_editor(
                "s4",
                JsonEditorArgs {
                    operation: "remove".to_string(),
                    file_path: "x.json".to_string(),
                    json_path: Some("$.a[0]".to_string()),
                    value: None,
                    pretty_print: None,
                },
            )
            .await;
        assert_ok(&out);
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(root.join("x.json")).unwrap()).unwrap();
        assert_eq!(doc["a"], serde_json::json!([2, 3]));
    }

    // S5: code_search finds the top-level function definition.
    #[tokio::test]
    async fn s5_code_search_finds_function() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::write(root.join("a.py"), "def f():\n    return 1\n").unwrap();
        let dispatcher = dispatcher(&root);

        let out = dispatcher
            .code_search(
                "s5",
                CodeSearchArgs {
                    command: "search_function".to_string(),
                    path: ".".to_string(),
                    identifier: "f".to_string(),
                    print_body: None,
                },
            )
            .await;
        let content = assert_ok(&out);
        let hits = content["hits"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["file_path"], "a.py".into());
        assert_eq!(hits[0]["start_line"], 1.into());
    }

    #[tokio::test]
    async fn sequential_thinking_tracks_branches_across_calls() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let dispatcher = dispatcher(&root);

        let first = dispatcher
            .sequential_thinking(
                "s6",
                SequentialThinkingArgs {
                    thought: "start".to_string(),
                    thought_number: 1,
                    total_thoughts: 1,
                    next_thought_needed: true,
                    is_revision: None,
                    revises_thought: None,
                    branch_from_thought: None,
                    branch_id: None,
                    needs_more_thoughts: None,
                },
            )
            .await;
        let content = assert_ok(&first);
        assert_eq!(content["history_length"], 1.into());

        let branched = dispatcher
            .sequential_thinking(
                "s6",
                SequentialThinkingArgs {
                    thought: "alternate path".to_string(),
                    thought_number: 2,
                    total_thoughts: 2,
                    next_thought_needed: false,
                    is_revision: None,
                    revises_thought: None,
                    branch_from_thought: Some(1),
                    branch_id: Some("alt".to_string()),
                    needs_more_thoughts: None,
                },
            )
            .await;
        let content = assert_ok(&branched);
        assert_eq!(content["branches"], serde_json::json!(["alt"]));
        assert_eq!(content["history_length"], 2.into());
    }

    #[tokio::test]
    async fn task_done_reports_session_phase() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let dispatcher = dispatcher(&root);
        let out = dispatcher.task_done("s7").await;
        let content = assert_ok(&out);
        assert_eq!(content["phase"], "Discovery".into());
    }
}
