//! MCP tool definitions: one `#[tool]`-annotated method per entry in the
//! tool catalog (spec.md §6), each a thin wrapper deserializing its typed
//! arguments and delegating to a [`dts_dispatch::Dispatcher`].

use std::sync::Arc;

use dts_core::ToolOutcome;
use dts_dispatch::{
    BashArgs, CodeSearchArgs, Dispatcher, FileEditorArgs, GitDiffArgs, JsonEditorArgs,
    NavigatorArgs, SequentialThinkingArgs,
};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::schemars;
use rmcp::tool;
use rmcp::tool_handler;
use rmcp::tool_router;
use rmcp::{ErrorData as McpError, ServerHandler};

fn map_outcome(outcome: ToolOutcome) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&outcome.content)
        .map_err(|e| McpError::internal_error(format!("failed to serialize result: {e}"), None))?;
    if outcome.success {
        Ok(CallToolResult::success(vec![Content::text(text)]))
    } else {
        let code = outcome.error_code.unwrap_or("Internal");
        Ok(CallToolResult::error(vec![Content::text(format!(
            "[{code}] {text}"
        ))]))
    }
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpNavigatorArgs {
    pub session_id: String,
    pub subcommand: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub view_range: Option<(i64, i64)>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpBashArgs {
    pub session_id: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub restart: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpFileEditorArgs {
    pub session_id: String,
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

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpJsonEditorArgs {
    pub session_id: String,
    pub operation: String,
    pub file_path: String,
    #[serde(default)]
    pub json_path: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub pretty_print: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpCodeSearchArgs {
    pub session_id: String,
    pub command: String,
    pub path: String,
    pub identifier: String,
    #[serde(default)]
    pub print_body: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpGitDiffArgs {
    pub session_id: String,
    pub path: String,
    #[serde(default)]
    pub base_commit: Option<String>,
    #[serde(default)]
    pub filter_tests: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpSequentialThinkingArgs {
    pub session_id: String,
    pub thought: String,
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub next_thought_needed: bool,
    #[serde(default)]
    pub is_revision: Option<bool>,
    #[serde(default)]
    pub revises_thought: Option<u32>,
    #[serde(default)]
    pub branch_from_thought: Option<u32>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub needs_more_thoughts: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct McpTaskDoneArgs {
    pub session_id: String,
}

/// The dev-tools MCP server: exposes the fixed tool catalog over a shared
/// [`Dispatcher`]. Cheap to clone -- the router and dispatcher are both
/// `Arc`-backed.
#[derive(Clone)]
pub struct DevToolsServer {
    dispatcher: Arc<Dispatcher>,
    tool_router: ToolRouter<DevToolsServer>,
}

impl DevToolsServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl DevToolsServer {
    #[tool(
        description = "Navigate the session sandbox: cd, pwd, ls, read a file or directory, or lock_cwd to move the session from Discovery into Edit phase. Always available, in any phase."
    )]
    async fn navigator(
        &self,
        Parameters(p): Parameters<McpNavigatorArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .navigator(
                &p.session_id,
                NavigatorArgs {
                    subcommand: p.subcommand,
                    path: p.path,
                    view_range: p.view_range,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "Run a command in the session's persistent shell (or restart it). Only available after the session has called navigator lock_cwd to enter Edit phase."
    )]
    async fn bash(
        &self,
        Parameters(p): Parameters<McpBashArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .bash(
                &p.session_id,
                BashArgs {
                    command: p.command,
                    restart: p.restart,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "View, create, replace, or insert text in a file within the sandbox. `view` is available in any phase; `create`/`replace`/`insert` require Edit phase."
    )]
    async fn file_editor(
        &self,
        Parameters(p): Parameters<McpFileEditorArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .file_editor(
                &p.session_id,
                FileEditorArgs {
                    operation: p.operation,
                    path: p.path,
                    file_text: p.file_text,
                    old_str: p.old_str,
                    new_str: p.new_str,
                    insert_line: p.insert_line,
                    view_range: p.view_range,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "View, set, add, or remove a value at a JSONPath in a JSON file within the sandbox. `view` is available in any phase; `set`/`add`/`remove` require Edit phase."
    )]
    async fn json_editor(
        &self,
        Parameters(p): Parameters<McpJsonEditorArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .json_editor(
                &p.session_id,
                JsonEditorArgs {
                    operation: p.operation,
                    file_path: p.file_path,
                    json_path: p.json_path,
                    value: p.value,
                    pretty_print: p.pretty_print,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "Search the session's project for a function, class, or class method definition by exact name, using the incrementally maintained code knowledge graph. Always available."
    )]
    async fn code_search(
        &self,
        Parameters(p): Parameters<McpCodeSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .code_search(
                &p.session_id,
                CodeSearchArgs {
                    command: p.command,
                    path: p.path,
                    identifier: p.identifier,
                    print_body: p.print_body,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "Show the git diff of the working tree (optionally against a base commit) for a path in the sandbox. Always available."
    )]
    async fn git_diff(
        &self,
        Parameters(p): Parameters<McpGitDiffArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .git_diff(
                &p.session_id,
                GitDiffArgs {
                    path: p.path,
                    base_commit: p.base_commit,
                    filter_tests: p.filter_tests,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "Record one step of an explicit, revisable reasoning trace. Supports revising earlier thoughts and branching off of them. Always available."
    )]
    async fn sequential_thinking(
        &self,
        Parameters(p): Parameters<McpSequentialThinkingArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .sequential_thinking(
                &p.session_id,
                SequentialThinkingArgs {
                    thought: p.thought,
                    thought_number: p.thought_number,
                    total_thoughts: p.total_thoughts,
                    next_thought_needed: p.next_thought_needed,
                    is_revision: p.is_revision,
                    revises_thought: p.revises_thought,
                    branch_from_thought: p.branch_from_thought,
                    branch_id: p.branch_id,
                    needs_more_thoughts: p.needs_more_thoughts,
                },
            )
            .await;
        map_outcome(outcome)
    }

    #[tool(
        description = "Report the session's current phase and how many thoughts have been recorded. Call when the task is believed complete."
    )]
    async fn task_done(
        &self,
        Parameters(p): Parameters<McpTaskDoneArgs>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self.dispatcher.task_done(&p.session_id).await;
        map_outcome(outcome)
    }
}

#[tool_handler]
impl ServerHandler for DevToolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dev-tools-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Sessions start in Discovery phase: navigator, code_search, git_diff, \
                 sequential_thinking, task_done, and file_editor/json_editor `view` are all \
                 available. Call navigator with subcommand=lock_cwd to enter Edit phase, which \
                 unlocks bash and the write operations of file_editor/json_editor. The phase \
                 transition is one-way for the lifetime of the session."
                    .to_string(),
            ),
        }
    }
}
