//! Per-language syntactic extractors. Each walks its language's concrete
//! syntax tree via tree-sitter and emits [`crate::entries::FunctionEntry`]
//! and [`crate::entries::ClassEntry`] records. Unrecognized extensions are
//! ignored by [`extractor_for_extension`], which is the only entry point the
//! rest of the crate should call.

mod c;
mod cpp;
mod generic;
mod java;
mod javascript;
mod python;
mod typescript;

pub use generic::TsExtractor;

/// Map a file extension (without the leading dot) to the extractor that
/// handles it, or `None` if the language isn't supported.
pub fn extractor_for_extension(extension: &str) -> Option<TsExtractor> {
    match extension {
        "py" => Some(python::extractor()),
        "java" => Some(java::extractor()),
        "c" | "h" => Some(c::extractor()),
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => Some(cpp::extractor()),
        "ts" => Some(typescript::extractor()),
        "js" | "jsx" | "mjs" | "cjs" => Some(javascript::extractor()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_function_and_class_are_extracted() {
        let extractor = extractor_for_extension("py").unwrap();
        let source = "class Greeter:\n    def hello(self):\n        return 1\n\n\ndef top_level():\n    pass\n";
        let extracted = extractor.extract("greet.py", source);
        assert!(extracted.functions.iter().any(|f| f.name == "top_level" && f.parent_class.is_none()));
        assert!(extracted
            .functions
            .iter()
            .any(|f| f.name == "hello" && f.parent_class.as_deref() == Some("Greeter")));
        assert_eq!(extracted.classes.len(), 1);
        assert_eq!(extracted.classes[0].name, "Greeter");
    }

    #[test]
    fn unknown_extension_yields_no_extractor() {
        assert!(extractor_for_extension("rs").is_none());
    }

    #[test]
    fn c_function_is_extracted_with_no_classes() {
        let extractor = extractor_for_extension("c").unwrap();
        let source = "int add(int a, int b) {\n    return a + b;\n}\n";
        let extracted = extractor.extract("math.c", source);
        assert_eq!(extracted.functions.len(), 1);
        assert_eq!(extracted.functions[0].name, "add");
        assert!(extracted.classes.is_empty());
    }
}
