//! Git Diff Adapter: shells out to `git diff` against a sandboxed repository
//! path. See spec.md §4.8.

use std::path::Path;
use std::process::Command;

use dts_core::{ToolError, ToolResult};
use tracing::warn;

const TEST_PATH_MARKERS: &[&str] = &[
    "/test/", "/tests/", "/__tests__/", "/spec/", "_test.", "_spec.", ".test.", ".spec.",
];

fn validate_revision(rev: &str) -> ToolResult<()> {
    if rev.starts_with('-') {
        return Err(ToolError::BadArguments(format!(
            "invalid revision '{rev}': must not start with '-'"
        )));
    }
    Ok(())
}

/// Run `git diff HEAD` (or `git diff <base>..HEAD` when `base` is supplied)
/// in `repo`. When `filter_tests` is set, hunks whose file path looks like a
/// test file are dropped from the result.
pub fn diff(repo: &Path, base: Option<&str>, filter_tests: bool) -> ToolResult<String> {
    let mut args = vec!["diff".to_string()];
    match base {
        Some(rev) => {
            validate_revision(rev)?;
            args.push(format!("{rev}..HEAD"));
        }
        None => args.push("HEAD".to_string()),
    }

    let output = Command::new("git")
        .args(&args)
        .current_dir(repo)
        .output()
        .map_err(|e| ToolError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        warn!(repo = %repo.display(), %stderr, "git diff failed");
        return Err(ToolError::GitError(stderr));
    }

    let raw = String::from_utf8_lossy(&output.stdout).into_owned();
    Ok(if filter_tests {
        filter_test_hunks(&raw)
    } else {
        raw
    })
}

fn hunk_touches_test_path(hunk: &str) -> bool {
    let header = hunk.lines().next().unwrap_or_default();
    TEST_PATH_MARKERS
        .iter()
        .any(|marker| header.contains(marker))
}

/// Drop every `diff --git` hunk whose header path matches a common test
/// directory or filename convention.
fn filter_test_hunks(raw: &str) -> String {
    let mut kept = Vec::new();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        if line.starts_with("diff --git ") {
            if let Some(hunk) = current.take() {
                if !hunk_touches_test_path(&hunk) {
                    kept.push(hunk);
                }
            }
            current = Some(String::new());
        }
        if let Some(hunk) = current.as_mut() {
            hunk.push_str(line);
            hunk.push('\n');
        }
    }
    if let Some(hunk) = current {
        if !hunk_touches_test_path(&hunk) {
            kept.push(hunk);
        }
    }

    kept.join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(repo: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(repo)
            .status()
            .unwrap();
        assert!(status.success());
    }

    fn init_repo() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        run(temp.path(), &["init"]);
        run(temp.path(), &["config", "user.email", "test@example.com"]);
        run(temp.path(), &["config", "user.name", "test"]);
        std::fs::write(temp.path().join("a.txt"), "one\n").unwrap();
        run(temp.path(), &["add", "."]);
        run(temp.path(), &["commit", "-m", "initial"]);
        temp
    }

    #[test]
    fn diff_against_head_reports_unstaged_changes() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "one\ntwo\n").unwrap();
        let output = diff(repo.path(), None, false).unwrap();
        assert!(output.contains("+two"));
    }

    #[test]
    fn bad_base_revision_is_rejected() {
        let repo = init_repo();
        let err = diff(repo.path(), Some("--upload-pack=evil"), false).unwrap_err();
        assert_eq!(err.code(), "BadArguments");
    }

    #[test]
    fn git_failure_is_surfaced_as_git_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = diff(temp.path(), None, false).unwrap_err();
        assert_eq!(err.code(), "GitError");
    }

    #[test]
    fn filter_tests_drops_test_file_hunks() {
        let raw = "diff --git a/src/lib.rs b/src/lib.rs\n@@ -1 +1 @@\n-old\n+new\ndiff --git a/tests/it.rs b/tests/it.rs\n@@ -1 +1 @@\n-old\n+new\n";
        let filtered = filter_test_hunks(raw);
        assert!(filtered.contains("src/lib.rs"));
        assert!(!filtered.contains("tests/it.rs"));
    }
}
