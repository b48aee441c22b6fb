use serde::{Deserialize, Serialize};

/// Lifecycle phase of a session. Monotonic: once `Edit`, never `Discovery` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Discovery,
    Edit,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "Discovery",
            Self::Edit => "Edit",
        }
    }

    /// Attempt to move to `Edit`. Returns `false` if already there (still `Edit`,
    /// never an error: locking an already-locked session is a no-op).
    pub fn lock(&mut self) -> bool {
        let was_discovery = matches!(self, Self::Discovery);
        *self = Self::Edit;
        was_discovery
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The uniform shape every tool handler resolves to before being mapped onto
/// the MCP `CallToolResult`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl ToolOutcome {
    pub fn ok(content: serde_json::Value) -> Self {
        Self {
            success: true,
            content,
            error_code: None,
        }
    }

    pub fn ok_text(text: impl Into<String>) -> Self {
        Self::ok(serde_json::Value::String(text.into()))
    }

    pub fn err(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: serde_json::Value::String(message.into()),
            error_code: Some(code),
        }
    }
}

impl From<crate::error::ToolError> for ToolOutcome {
    fn from(err: crate::error::ToolError) -> Self {
        Self::err(err.code(), err.to_string())
    }
}

/// Appends a truncation marker to `text` if it exceeds `max_bytes`, following
/// the byte budget (not char budget) so callers can bound memory precisely.
pub fn truncate_bytes(text: &str, max_bytes: usize) -> (String, bool) {
    if text.len() <= max_bytes {
        return (text.to_string(), false);
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_string(), true)
}

pub const TRUNCATION_MARKER: &str = "\n... [output truncated]";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_lock_is_monotonic() {
        let mut phase = Phase::Discovery;
        assert!(phase.lock());
        assert_eq!(phase, Phase::Edit);
        assert!(!phase.lock());
        assert_eq!(phase, Phase::Edit);
    }

    #[test]
    fn truncate_bytes_respects_char_boundaries() {
        let text = "héllo world";
        let (truncated, was_truncated) = truncate_bytes(text, 3);
        assert!(was_truncated);
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn truncate_bytes_noop_under_limit() {
        let (text, truncated) = truncate_bytes("short", 100);
        assert_eq!(text, "short");
        assert!(!truncated);
    }
}
