/// The taxonomy surfaced to MCP clients as `error_code`.
///
/// Variant names are the stable wire identifiers (see [`ToolError::code`]);
/// never rename a variant without updating clients that match on it.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("path '{0}' escapes the session sandbox")]
    PathEscape(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("match is not unique, found at lines {lines:?}")]
    NotUnique { lines: Vec<usize> },

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("tool '{tool}' is not available in phase {phase}")]
    PhaseViolation { tool: String, phase: String },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    #[error("shell session is broken, restart required")]
    ShellBroken,

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("database error: {0}")]
    DbError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// The stable identifier returned in the MCP response's `error_code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathEscape(_) => "PathEscape",
            Self::NotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::NotADirectory(_) => "NotADirectory",
            Self::NotAFile(_) => "NotAFile",
            Self::NotUnique { .. } => "NotUnique",
            Self::OutOfRange(_) => "OutOfRange",
            Self::PhaseViolation { .. } => "PhaseViolation",
            Self::UnknownTool(_) => "UnknownTool",
            Self::BadArguments(_) => "BadArguments",
            Self::CommandTimeout(_) => "CommandTimeout",
            Self::ShellBroken => "ShellBroken",
            Self::ParseError(_) => "ParseError",
            Self::GitError(_) => "GitError",
            Self::DbError(_) => "DbError",
            Self::Internal(_) => "Internal",
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
