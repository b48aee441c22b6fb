use super::generic::TsExtractor;

/// C has no classes; `class_query` is empty and `on_file_changed` simply
/// inserts no `ClassEntry` rows for `.c`/`.h` files.
pub fn extractor() -> TsExtractor {
    TsExtractor {
        language: tree_sitter_c::LANGUAGE.into(),
        function_query: r#"
            (function_definition
              declarator: (function_declarator
                declarator: (identifier) @function.name)) @function.def
        "#,
        class_query: "",
        class_node_kinds: &[],
        method_node_kinds: &[],
        field_node_kinds: &[],
    }
}
