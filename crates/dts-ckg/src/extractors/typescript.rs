use super::generic::TsExtractor;

pub fn extractor() -> TsExtractor {
    TsExtractor {
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        function_query: r#"
            (function_declaration
              name: (identifier) @function.name) @function.def
            (method_definition
              name: (property_identifier) @function.name) @function.def
        "#,
        class_query: r#"
            (class_declaration
              name: (type_identifier) @class.name
              body: (class_body) @class.body) @class.def
        "#,
        class_node_kinds: &["class_declaration"],
        method_node_kinds: &["method_definition"],
        field_node_kinds: &["public_field_definition"],
    }
}
