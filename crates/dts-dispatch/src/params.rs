//! Typed argument structs for each MCP tool, matching the schemas in
//! SPEC_FULL.md §6. These are what a transport layer deserializes the
//! incoming `arguments` map into before calling the [`crate::Dispatcher`].

use serde::Deserialize;

pub use dts_session::ThoughtRecord as SequentialThinkingArgs;

#[derive(Debug, Clone, Deserialize)]
pub struct NavigatorArgs {
    pub subcommand: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub view_range: Option<(i64, i64)>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BashArgs {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub restart: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEditorArgs {
    pub operation: String,
    pub path: String,
    #[serde(default)]
    pub file_text: Option<String>,
    #[serde(default)]
    pub old_str: Option<String>,
    #[serde(default)]
    pub new_str: Option<String>,
    #[serde(default)]
    pub insert_line: Option<i64>,
    #[serde(default)]
    pub view_range: Option<(i64, i64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonEditorArgs {
    pub operation: String,
    pub file_path: String,
    #[serde(default)]
    pub json_path: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub pretty_print: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchArgs {
    pub command: String,
    pub path: String,
    pub identifier: String,
    #[serde(default)]
    pub print_body: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitDiffArgs {
    pub path: String,
    #[serde(default)]
    pub base_commit: Option<String>,
    #[serde(default)]
    pub filter_tests: Option<bool>,
}
