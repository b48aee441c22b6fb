//! Text Edit Engine: view/create/replace/insert over sandboxed paths. See
//! spec.md §4.4. Paths passed in here are assumed already sandbox-resolved
//! by the Dispatcher; this crate never touches the Path Sandbox itself.

use std::path::Path;

use dts_core::{FileChangeNotifier, ToolError, ToolResult, TRUNCATION_MARKER, truncate_bytes};
use tracing::debug;

const SNIPPET_CONTEXT_LINES: usize = 4;
const MAX_DIR_DEPTH: usize = 2;

/// Result of a `view` call on either a file or a directory.
pub enum ViewResult {
    File { content: String, truncated: bool },
    Directory { entries: Vec<String> },
}

/// A rendered window of lines surrounding an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

fn number_lines(lines: &[&str], first_line_no: usize) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:6}\t{}", first_line_no + i, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn list_directory(root: &Path, max_depth: usize) -> ToolResult<Vec<String>> {
    fn walk(dir: &Path, depth: usize, max_depth: usize, out: &mut Vec<String>) -> ToolResult<()> {
        let mut children: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| ToolError::Internal(format!("reading {}: {e}", dir.display())))?
            .filter_map(Result::ok)
            .filter(|entry| !is_hidden(&entry.file_name()))
            .collect();
        children.sort_by_key(|e| e.file_name());

        for entry in children {
            let path = entry.path();
            let indent = "  ".repeat(depth);
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_dir() {
                out.push(format!("{indent}{name}/"));
                if depth + 1 < max_depth {
                    walk(&path, depth + 1, max_depth, out)?;
                }
            } else {
                out.push(format!("{indent}{name}"));
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(root, 0, max_depth, &mut out)?;
    Ok(out)
}

/// View a file (optionally a `[start, end]` 1-based line range, `end == -1`
/// meaning "to EOF") or list a directory up to two levels deep.
pub fn view(path: &Path, range: Option<(i64, i64)>, max_bytes: usize) -> ToolResult<ViewResult> {
    let metadata = std::fs::metadata(path).map_err(|_| ToolError::NotFound(path_str(path)))?;

    if metadata.is_dir() {
        let entries = list_directory(path, MAX_DIR_DEPTH)?;
        return Ok(ViewResult::Directory { entries });
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| ToolError::Internal(format!("reading {}: {e}", path.display())))?;
    let all_lines: Vec<&str> = raw.lines().collect();

    let (start, end) = match range {
        Some((s, e)) => {
            let start = s.max(1) as usize;
            let end = if e < 0 {
                all_lines.len()
            } else {
                let e = e as usize;
                if e > all_lines.len() {
                    return Err(ToolError::OutOfRange(format!(
                        "end_line {e} exceeds file length {}",
                        all_lines.len()
                    )));
                }
                e
            };
            (start, end)
        }
        None => (1, all_lines.len()),
    };

    let selected = if start > all_lines.len() || start > end {
        &[][..]
    } else {
        &all_lines[start - 1..end]
    };

    let rendered = number_lines(selected, start);
    let (mut content, truncated) = truncate_bytes(&rendered, max_bytes);
    if truncated {
        content.push_str(TRUNCATION_MARKER);
    }
    Ok(ViewResult::File { content, truncated })
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

fn snippet_around(content: &str, center_line: usize) -> Snippet {
    let lines: Vec<&str> = content.lines().collect();
    let start = center_line.saturating_sub(SNIPPET_CONTEXT_LINES).max(1);
    let end = (center_line + SNIPPET_CONTEXT_LINES).min(lines.len());
    let window = if start > lines.len() || start > end {
        &[][..]
    } else {
        &lines[start - 1..end]
    };
    Snippet {
        text: number_lines(window, start),
        start_line: start,
        end_line: end,
    }
}

/// Create a new file. Fails with `AlreadyExists` if the target is already
/// present; creates parent directories as needed.
pub async fn create(
    path: &Path,
    contents: &str,
    notifier: &dyn FileChangeNotifier,
) -> ToolResult<()> {
    if path.exists() {
        return Err(ToolError::AlreadyExists(path_str(path)));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ToolError::Internal(format!("creating {}: {e}", parent.display())))?;
    }
    std::fs::write(path, contents)
        .map_err(|e| ToolError::Internal(format!("writing {}: {e}", path.display())))?;
    debug!(path = %path.display(), "created file");
    notifier.on_file_changed(path).await;
    Ok(())
}

/// Replace the unique occurrence of `old_string` with `new_string`. The match
/// is literal: whitespace- and case-sensitive, never fuzzed.
pub async fn replace(
    path: &Path,
    old_string: &str,
    new_string: &str,
    notifier: &dyn FileChangeNotifier,
) -> ToolResult<Snippet> {
    let content = std::fs::read_to_string(path).map_err(|_| ToolError::NotFound(path_str(path)))?;

    let match_lines: Vec<usize> = content
        .match_indices(old_string)
        .map(|(byte_idx, _)| content[..byte_idx].matches('\n').count() + 1)
        .collect();

    match match_lines.len() {
        0 => return Err(ToolError::NotFound(old_string.to_string())),
        1 => {}
        _ => {
            return Err(ToolError::NotUnique {
                lines: match_lines,
            });
        }
    }

    let edit_line = match_lines[0];
    let updated = content.replacen(old_string, new_string, 1);
    std::fs::write(path, &updated)
        .map_err(|e| ToolError::Internal(format!("writing {}: {e}", path.display())))?;
    debug!(path = %path.display(), line = edit_line, "replaced match");
    notifier.on_file_changed(path).await;

    Ok(snippet_around(&updated, edit_line))
}

/// Insert `new_string` as a new line after 1-based `after_line` (0 means "at
/// the top of the file").
pub async fn insert(
    path: &Path,
    after_line: usize,
    new_string: &str,
    notifier: &dyn FileChangeNotifier,
) -> ToolResult<Snippet> {
    let content = std::fs::read_to_string(path).map_err(|_| ToolError::NotFound(path_str(path)))?;
    let mut lines: Vec<&str> = content.lines().collect();

    if after_line > lines.len() {
        return Err(ToolError::OutOfRange(format!(
            "line {after_line} exceeds file length {}",
            lines.len()
        )));
    }

    lines.insert(after_line, new_string);
    let updated = lines.join("\n") + "\n";
    std::fs::write(path, &updated)
        .map_err(|e| ToolError::Internal(format!("writing {}: {e}", path.display())))?;
    debug!(path = %path.display(), after_line, "inserted line");
    notifier.on_file_changed(path).await;

    Ok(snippet_around(&updated, after_line + 1))
}
