use super::generic::TsExtractor;

pub fn extractor() -> TsExtractor {
    TsExtractor {
        language: tree_sitter_cpp::LANGUAGE.into(),
        function_query: r#"
            (function_definition
              declarator: (function_declarator
                declarator: (identifier) @function.name)) @function.def
            (function_definition
              declarator: (function_declarator
                declarator: (field_identifier) @function.name)) @function.def
        "#,
        class_query: r#"
            (class_specifier
              name: (type_identifier) @class.name
              body: (field_declaration_list) @class.body) @class.def
            (struct_specifier
              name: (type_identifier) @class.name
              body: (field_declaration_list) @class.body) @class.def
        "#,
        class_node_kinds: &["class_specifier", "struct_specifier"],
        method_node_kinds: &["function_definition", "declaration"],
        field_node_kinds: &["field_declaration"],
    }
}
