/// A parsed function or method definition. See spec.md §3 "CKG Entities".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub file_path: String,
    pub body: String,
    pub start_line: usize,
    pub end_line: usize,
    pub parent_function: Option<String>,
    pub parent_class: Option<String>,
}

/// A parsed class (or struct/interface, depending on language) definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    pub file_path: String,
    pub body: String,
    pub start_line: usize,
    pub end_line: usize,
    pub fields: String,
    pub methods: String,
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub functions: Vec<FunctionEntry>,
    pub classes: Vec<ClassEntry>,
}

/// One hit returned by a search query, with the body omitted or truncated
/// depending on the caller's request.
#[derive(Debug, Clone)]
pub struct FunctionHit {
    pub name: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub parent_class: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassHit {
    pub name: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub body: Option<String>,
}
