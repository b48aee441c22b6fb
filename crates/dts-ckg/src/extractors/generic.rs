//! A tree-sitter-query-driven extractor shared by every language module.
//! Each language supplies its grammar, a query locating function/method and
//! class definitions, and the node kinds used to find a definition's
//! enclosing class when walking up the tree.

use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::entries::{ClassEntry, ExtractedFile, FunctionEntry};

pub struct TsExtractor {
    pub language: Language,
    /// Query with captures `@function.def` / `@function.name` for every
    /// function- or method-like definition.
    pub function_query: &'static str,
    /// Query with captures `@class.def` / `@class.name` / `@class.body` for
    /// every class-like definition. Empty for languages with no classes.
    pub class_query: &'static str,
    /// Node kinds that count as "a class" when walking up from a function
    /// to find its parent_class.
    pub class_node_kinds: &'static [&'static str],
    /// Node kinds inside a class body counted as methods (signature only).
    pub method_node_kinds: &'static [&'static str],
    /// Node kinds inside a class body counted as fields (full text).
    pub field_node_kinds: &'static [&'static str],
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or_default()
}

fn enclosing_class_name(node: Node, source: &str, class_kinds: &[&str]) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if class_kinds.contains(&n.kind()) {
            let mut cursor = n.walk();
            for child in n.named_children(&mut cursor) {
                if child.kind().contains("identifier") {
                    return Some(node_text(child, source).to_string());
                }
            }
            return None;
        }
        current = n.parent();
    }
    None
}

fn summarize_body(
    body: Node,
    source: &str,
    method_kinds: &[&str],
    field_kinds: &[&str],
) -> (String, String) {
    let mut fields = Vec::new();
    let mut methods = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        let kind = child.kind();
        let text = node_text(child, source).trim();
        if method_kinds.contains(&kind) {
            let signature = text.split(['{', '\n']).next().unwrap_or(text).trim();
            methods.push(signature.to_string());
        } else if field_kinds.contains(&kind) {
            fields.push(text.to_string());
        }
    }
    (fields.join("\n"), methods.join("\n"))
}

impl TsExtractor {
    pub fn extract(&self, file_path: &str, source: &str) -> ExtractedFile {
        let mut parser = Parser::new();
        if parser.set_language(&self.language).is_err() {
            return ExtractedFile::default();
        }
        let Some(tree) = parser.parse(source, None) else {
            return ExtractedFile::default();
        };
        let root = tree.root_node();
        let bytes = source.as_bytes();

        let mut functions = Vec::new();
        if let Ok(query) = Query::new(&self.language, self.function_query) {
            let def_idx = query.capture_index_for_name("function.def");
            let name_idx = query.capture_index_for_name("function.name");
            let mut cursor = QueryCursor::new();
            let mut matches = cursor.matches(&query, root, bytes);
            while let Some(m) = matches.next() {
                let mut def_node = None;
                let mut name = None;
                for capture in m.captures {
                    if Some(capture.index) == def_idx {
                        def_node = Some(capture.node);
                    }
                    if Some(capture.index) == name_idx {
                        name = Some(node_text(capture.node, source).to_string());
                    }
                }
                if let (Some(node), Some(name)) = (def_node, name) {
                    functions.push(FunctionEntry {
                        name,
                        file_path: file_path.to_string(),
                        body: node_text(node, source).to_string(),
                        start_line: node.start_position().row + 1,
                        end_line: node.end_position().row + 1,
                        parent_function: None,
                        parent_class: enclosing_class_name(node, source, self.class_node_kinds),
                    });
                }
            }
        }

        let mut classes = Vec::new();
        if !self.class_query.is_empty() {
            if let Ok(query) = Query::new(&self.language, self.class_query) {
                let def_idx = query.capture_index_for_name("class.def");
                let name_idx = query.capture_index_for_name("class.name");
                let body_idx = query.capture_index_for_name("class.body");
                let mut cursor = QueryCursor::new();
                let mut matches = cursor.matches(&query, root, bytes);
                while let Some(m) = matches.next() {
                    let mut def_node = None;
                    let mut body_node = None;
                    let mut name = None;
                    for capture in m.captures {
                        if Some(capture.index) == def_idx {
                            def_node = Some(capture.node);
                        }
                        if Some(capture.index) == body_idx {
                            body_node = Some(capture.node);
                        }
                        if Some(capture.index) == name_idx {
                            name = Some(node_text(capture.node, source).to_string());
                        }
                    }
                    if let (Some(node), Some(name)) = (def_node, name) {
                        let (fields, methods) = body_node
                            .map(|b| {
                                summarize_body(
                                    b,
                                    source,
                                    self.method_node_kinds,
                                    self.field_node_kinds,
                                )
                            })
                            .unwrap_or_default();
                        classes.push(ClassEntry {
                            name,
                            file_path: file_path.to_string(),
                            body: node_text(node, source).to_string(),
                            start_line: node.start_position().row + 1,
                            end_line: node.end_position().row + 1,
                            fields,
                            methods,
                        });
                    }
                }
            }
        }

        ExtractedFile { functions, classes }
    }
}
