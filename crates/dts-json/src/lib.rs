//! JSON Edit Engine: JSONPath-driven view/set/add/remove over a JSON
//! document kept in memory between load and write-back. See spec.md §4.5.
//!
//! Reads go through [`jsonpath_rust`]'s query evaluator. Mutation needs both
//! "where did this match live" and "write through that location", which the
//! crate's read-only finder doesn't expose together, so `set`/`add`/`remove`
//! walk the document themselves over the subset of JSONPath this engine
//! accepts: dot segments, `[index]`, and the `[*]` wildcard.

use std::path::Path;

use dts_core::{FileChangeNotifier, ToolError, ToolResult};
use jsonpath_rust::JsonPathQuery;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

fn parse_segments(path: &str) -> ToolResult<Vec<Segment>> {
    let trimmed = path.strip_prefix('$').unwrap_or(path);
    let mut segments = Vec::new();
    let mut chars = trimmed.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
            }
            '[' => {
                chars.next();
                let mut token = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    token.push(c);
                }
                if token == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    let idx = token
                        .parse::<usize>()
                        .map_err(|_| ToolError::BadArguments(format!("bad index '{token}'")))?;
                    segments.push(Segment::Index(idx));
                }
            }
            _ => {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '.' || c == '[' {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                if token == "*" {
                    segments.push(Segment::Wildcard);
                } else if !token.is_empty() {
                    segments.push(Segment::Key(token));
                }
            }
        }
    }

    if segments.is_empty() {
        return Err(ToolError::BadArguments(format!(
            "path '{path}' has no segments"
        )));
    }
    Ok(segments)
}

/// A located match: its rendered JSONPath and the value found there.
#[derive(Debug, Clone)]
pub struct Match {
    pub path: String,
    pub value: Value,
}

fn walk<'a>(value: &'a Value, prefix: String, segments: &[Segment], out: &mut Vec<(String, &'a Value)>) {
    match segments.split_first() {
        None => out.push((prefix, value)),
        Some((Segment::Key(key), rest)) => {
            if let Value::Object(map) = value {
                if let Some(v) = map.get(key) {
                    walk(v, format!("{prefix}.{key}"), rest, out);
                }
            }
        }
        Some((Segment::Index(i), rest)) => {
            if let Value::Array(arr) = value {
                if let Some(v) = arr.get(*i) {
                    walk(v, format!("{prefix}[{i}]"), rest, out);
                }
            }
        }
        Some((Segment::Wildcard, rest)) => match value {
            Value::Object(map) => {
                for (k, v) in map.iter() {
                    walk(v, format!("{prefix}.{k}"), rest, out);
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter().enumerate() {
                    walk(v, format!("{prefix}[{i}]"), rest, out);
                }
            }
            _ => {}
        },
    }
}

fn walk_mut(
    value: &mut Value,
    prefix: String,
    segments: &[Segment],
    f: &mut dyn FnMut(String, &mut Value),
) {
    match segments.split_first() {
        None => f(prefix, value),
        Some((Segment::Key(key), rest)) => {
            if let Value::Object(map) = value {
                if let Some(v) = map.get_mut(key) {
                    walk_mut(v, format!("{prefix}.{key}"), rest, f);
                }
            }
        }
        Some((Segment::Index(i), rest)) => {
            if let Value::Array(arr) = value {
                if let Some(v) = arr.get_mut(*i) {
                    walk_mut(v, format!("{prefix}[{i}]"), rest, f);
                }
            }
        }
        Some((Segment::Wildcard, rest)) => match value {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    walk_mut(v, format!("{prefix}.{k}"), rest, &mut *f);
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter_mut().enumerate() {
                    walk_mut(v, format!("{prefix}[{i}]"), rest, &mut *f);
                }
            }
            _ => {}
        },
    }
}

/// Load a JSON document from `path`.
pub fn load(path: &Path) -> ToolResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(|_| ToolError::NotFound(path_str(path)))?;
    serde_json::from_str(&raw).map_err(|e| ToolError::ParseError(e.to_string()))
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

fn write_back(path: &Path, doc: &Value, pretty_print: bool) -> ToolResult<()> {
    let rendered = if pretty_print {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    }
    .map_err(|e| ToolError::Internal(format!("serializing json: {e}")))?;
    std::fs::write(path, rendered)
        .map_err(|e| ToolError::Internal(format!("writing {}: {e}", path.display())))
}

/// View the whole document, or every match of `path` with its location.
pub fn view(doc: &Value, path: Option<&str>) -> ToolResult<Vec<Match>> {
    match path {
        None => Ok(vec![Match {
            path: "$".to_string(),
            value: doc.clone(),
        }]),
        Some(path_expr) => {
            // Validate the expression is at least well-formed JSONPath via the
            // crate's evaluator before running our own walker over it.
            doc.clone()
                .path(path_expr)
                .map_err(|e| ToolError::BadArguments(format!("invalid JSONPath '{path_expr}': {e}")))?;

            let segments = parse_segments(path_expr)?;
            let mut matches = Vec::new();
            walk(doc, "$".to_string(), &segments, &mut matches);
            Ok(matches
                .into_iter()
                .map(|(path, value)| Match {
                    path,
                    value: value.clone(),
                })
                .collect())
        }
    }
}

/// Replace the value at every match of `path` with `new_value`.
pub async fn set(
    file: &Path,
    path: &str,
    new_value: Value,
    pretty_print: bool,
    notifier: &dyn FileChangeNotifier,
) -> ToolResult<usize> {
    let mut doc = load(file)?;
    let segments = parse_segments(path)?;
    let mut count = 0usize;
    walk_mut(&mut doc, "$".to_string(), &segments, &mut |_p, v| {
        *v = new_value.clone();
        count += 1;
    });
    if count == 0 {
        return Err(ToolError::NotFound(path.to_string()));
    }
    write_back(file, &doc, pretty_print)?;
    debug!(file = %file.display(), path, count, "set matched values");
    notifier.on_file_changed(file).await;
    Ok(count)
}

/// Add/overwrite a key on an object, or append to an array. If `path`
/// already resolves to an array, the value is pushed onto it; otherwise
/// the last segment is inserted as a key (or pushed) on its parent, which
/// must already exist.
pub async fn add(
    file: &Path,
    path: &str,
    value: Value,
    pretty_print: bool,
    notifier: &dyn FileChangeNotifier,
) -> ToolResult<()> {
    let mut doc = load(file)?;
    let segments = parse_segments(path)?;

    let mut appended = 0usize;
    walk_mut(&mut doc, "$".to_string(), &segments, &mut |_p, existing| {
        if let Value::Array(arr) = existing {
            arr.push(value.clone());
            appended += 1;
        }
    });

    if appended == 0 {
        let (parent_segments, last) = segments.split_at(segments.len() - 1);
        let mut found_parent = false;
        walk_mut(&mut doc, "$".to_string(), parent_segments, &mut |_p, parent| {
            found_parent = true;
            match parent {
                Value::Object(map) => {
                    if let Segment::Key(key) = &last[0] {
                        map.insert(key.clone(), value.clone());
                    }
                }
                Value::Array(arr) => arr.push(value.clone()),
                _ => {}
            }
        });

        if !found_parent {
            return Err(ToolError::NotFound(path.to_string()));
        }
    }

    write_back(file, &doc, pretty_print)?;
    debug!(file = %file.display(), path, "added value");
    notifier.on_file_changed(file).await;
    Ok(())
}

/// Delete every matched element from its parent.
pub async fn remove(
    file: &Path,
    path: &str,
    pretty_print: bool,
    notifier: &dyn FileChangeNotifier,
) -> ToolResult<usize> {
    let mut doc = load(file)?;
    let segments = parse_segments(path)?;
    let (parent_segments, last) = segments.split_at(segments.len() - 1);

    let mut removed = 0usize;
    walk_mut(&mut doc, "$".to_string(), parent_segments, &mut |_p, parent| {
        match (&last[0], parent) {
            (Segment::Key(key), Value::Object(map)) => {
                if map.remove(key).is_some() {
                    removed += 1;
                }
            }
            (Segment::Index(i), Value::Array(arr)) if *i < arr.len() => {
                arr.remove(*i);
                removed += 1;
            }
            _ => {}
        }
    });

    if removed == 0 {
        return Err(ToolError::NotFound(path.to_string()));
    }
    write_back(file, &doc, pretty_print)?;
    debug!(file = %file.display(), path, removed, "removed values");
    notifier.on_file_changed(file).await;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dts_core::NullNotifier;
    use serde_json::json;

    fn write_doc(dir: &Path, value: &Value) -> std::path::PathBuf {
        let path = dir.join("doc.json");
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn view_whole_document_without_path() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": 1});
        let path = write_doc(temp.path(), &doc);
        let loaded = load(&path).unwrap();
        let matches = view(&loaded, None).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, doc);
    }

    #[test]
    fn view_with_path_reports_location() {
        let doc = json!({"a": {"b": 1}});
        let matches = view(&doc, Some("$.a.b")).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "$.a.b");
        assert_eq!(matches[0].value, json!(1));
    }

    #[tokio::test]
    async fn set_replaces_every_match() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"items": [{"v": 1}, {"v": 2}]});
        let path = write_doc(temp.path(), &doc);

        let count = set(&path, "$.items[*].v", json!(0), true, &NullNotifier)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let updated = load(&path).unwrap();
        assert_eq!(updated["items"][0]["v"], json!(0));
        assert_eq!(updated["items"][1]["v"], json!(0));
    }

    #[tokio::test]
    async fn set_on_missing_path_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": 1});
        let path = write_doc(temp.path(), &doc);
        let err = set(&path, "$.missing", json!(1), true, &NullNotifier)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NotFound");
    }

    #[tokio::test]
    async fn add_overwrites_object_key() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": {}});
        let path = write_doc(temp.path(), &doc);
        add(&path, "$.a.b", json!(42), true, &NullNotifier)
            .await
            .unwrap();
        let updated = load(&path).unwrap();
        assert_eq!(updated["a"]["b"], json!(42));
    }

    #[tokio::test]
    async fn add_appends_to_array_via_explicit_index() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"items": [1, 2]});
        let path = write_doc(temp.path(), &doc);
        add(&path, "$.items[2]", json!(3), true, &NullNotifier)
            .await
            .unwrap();
        let updated = load(&path).unwrap();
        assert_eq!(updated["items"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn add_appends_to_array_named_directly() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": [1, 2]});
        let path = write_doc(temp.path(), &doc);
        add(&path, "$.a", json!(3), true, &NullNotifier).await.unwrap();
        let updated = load(&path).unwrap();
        assert_eq!(updated["a"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn set_can_write_compact_output() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": 1});
        let path = write_doc(temp.path(), &doc);
        set(&path, "$.a", json!(2), false, &NullNotifier)
            .await
            .unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"a":2}"#);
    }

    #[tokio::test]
    async fn remove_deletes_matched_key() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": 1, "b": 2});
        let path = write_doc(temp.path(), &doc);
        remove(&path, "$.a", true, &NullNotifier).await.unwrap();
        let updated = load(&path).unwrap();
        assert!(updated.get("a").is_none());
        assert_eq!(updated["b"], json!(2));
    }

    #[tokio::test]
    async fn remove_on_missing_path_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let doc = json!({"a": 1});
        let path = write_doc(temp.path(), &doc);
        let err = remove(&path, "$.missing", true, &NullNotifier)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NotFound");
    }
}
