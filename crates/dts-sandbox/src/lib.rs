//! Resolves user-supplied paths against a session's sandbox root.
//!
//! Every engine must go through [`resolve`] (or [`resolve_for_create`]) before
//! touching the filesystem; see spec.md §4.2.

use std::path::{Component, Path, PathBuf};

use dts_core::{ToolError, ToolResult};

/// Lexically join `cwd` with `input` and collapse `.`/`..` segments without
/// touching the filesystem. This does not resolve symlinks.
fn lexical_join(cwd: &Path, input: &str) -> PathBuf {
    let joined = if Path::new(input).is_absolute() {
        PathBuf::from(input)
    } else {
        cwd.join(input)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor of `path`, then re-append the
/// non-existent tail. Lets `create`-style operations validate a parent
/// directory that is itself a symlink without requiring the leaf to exist.
fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canon) => {
                let mut result = canon;
                for component in tail.iter().rev() {
                    result.push(component);
                }
                return Ok(result);
            }
            Err(_) => {
                let Some(parent) = existing.parent() else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no existing ancestor found",
                    ));
                };
                if let Some(name) = existing.file_name() {
                    tail.push(name);
                }
                existing = parent;
            }
        }
    }
}

fn assert_contained(root: &Path, candidate: &Path, original: &str) -> ToolResult<PathBuf> {
    if candidate == root || candidate.starts_with(root) {
        Ok(candidate.to_path_buf())
    } else {
        Err(ToolError::PathEscape(original.to_string()))
    }
}

/// Resolve a path that must already exist on disk (the common case: `view`,
/// `replace`, `cd`, `code_search`, ...).
pub fn resolve(root: &Path, cwd: &Path, input: &str) -> ToolResult<PathBuf> {
    let lexical = lexical_join(cwd, input);
    let canonical = canonicalize_existing_prefix(&lexical)
        .map_err(|_| ToolError::NotFound(input.to_string()))?;
    assert_contained(root, &canonical, input)
}

/// Resolve a path for an operation that may create the leaf (`file_editor
/// create`). Only the parent directory is required to exist.
pub fn resolve_for_create(root: &Path, cwd: &Path, input: &str) -> ToolResult<PathBuf> {
    let lexical = lexical_join(cwd, input);
    let canonical = canonicalize_existing_prefix(&lexical)
        .map_err(|_| ToolError::PathEscape(input.to_string()))?;
    assert_contained(root, &canonical, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_resolves_under_cwd() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();

        let resolved = resolve(&root, &root, "src").unwrap();
        assert_eq!(resolved, root.join("src"));
    }

    #[test]
    fn dotdot_escape_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("w");
        std::fs::create_dir_all(&root).unwrap();
        let root = root.canonicalize().unwrap();

        let err = resolve(&root, &root, "../..").unwrap_err();
        assert_eq!(err.code(), "PathEscape");
    }

    #[test]
    fn root_itself_is_allowed() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let resolved = resolve(&root, &root, ".").unwrap();
        assert_eq!(resolved, root);
    }

    #[test]
    fn create_allows_nonexistent_leaf_under_existing_parent() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let resolved = resolve_for_create(&root, &root, "new_file.txt").unwrap();
        assert_eq!(resolved, root.join("new_file.txt"));
    }

    #[test]
    fn create_rejects_escaping_parent() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("w");
        std::fs::create_dir_all(&root).unwrap();
        let root = root.canonicalize().unwrap();

        let err = resolve_for_create(&root, &root, "../escape.txt").unwrap_err();
        assert_eq!(err.code(), "PathEscape");
    }

    #[test]
    fn absolute_path_outside_root_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let err = resolve(&root, &root, "/").unwrap_err();
        assert_eq!(err.code(), "PathEscape");
    }
}
