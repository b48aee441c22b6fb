use super::generic::TsExtractor;

pub fn extractor() -> TsExtractor {
    TsExtractor {
        language: tree_sitter_java::LANGUAGE.into(),
        function_query: r#"
            (method_declaration
              name: (identifier) @function.name) @function.def
            (constructor_declaration
              name: (identifier) @function.name) @function.def
        "#,
        class_query: r#"
            (class_declaration
              name: (identifier) @class.name
              body: (class_body) @class.body) @class.def
        "#,
        class_node_kinds: &["class_declaration"],
        method_node_kinds: &["method_declaration", "constructor_declaration"],
        field_node_kinds: &["field_declaration"],
    }
}
