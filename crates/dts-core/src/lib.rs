//! Shared types used across the tool-server crates: the error taxonomy,
//! session phase, and uniform tool outcome shape.

pub mod error;
pub mod notify;
pub mod types;

pub use error::{ToolError, ToolResult};
pub use notify::{FileChangeNotifier, NullNotifier};
pub use types::{Phase, ToolOutcome, TRUNCATION_MARKER, truncate_bytes};
