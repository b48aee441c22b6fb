use super::generic::TsExtractor;

pub fn extractor() -> TsExtractor {
    TsExtractor {
        language: tree_sitter_python::LANGUAGE.into(),
        function_query: r#"
            (function_definition
              name: (identifier) @function.name) @function.def
        "#,
        class_query: r#"
            (class_definition
              name: (identifier) @class.name
              body: (block) @class.body) @class.def
        "#,
        class_node_kinds: &["class_definition"],
        method_node_kinds: &["function_definition"],
        field_node_kinds: &["expression_statement"],
    }
}
