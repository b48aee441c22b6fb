//! Sequential Thinking: an append-only log of thoughts. See spec.md §4.7.
//! Revisions and branches are data, not in-place mutations.

use std::collections::HashMap;

use dts_core::{ToolError, ToolResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtRecord {
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

#[derive(Debug, Clone, Serialize)]
pub struct AppendResult {
    pub appended_index: usize,
    pub branches: Vec<String>,
    pub history_length: usize,
}

#[derive(Default)]
pub struct ThoughtLog {
    history: Vec<ThoughtRecord>,
    branches: HashMap<String, Vec<usize>>,
}

impl ThoughtLog {
    /// Append one thought. `total_thoughts` is raised to `thought_number` if
    /// the caller under-reported it; a supplied `branch_id` also appends the
    /// thought's history index to that branch's sequence.
    pub fn append(&mut self, mut record: ThoughtRecord) -> ToolResult<AppendResult> {
        if record.thought_number < 1 {
            return Err(ToolError::BadArguments(
                "thought_number must be >= 1".to_string(),
            ));
        }
        if record.thought_number > record.total_thoughts {
            record.total_thoughts = record.thought_number;
        }

        let branch_id = record.branch_id.clone();
        self.history.push(record);
        let appended_index = self.history.len();

        if let Some(branch_id) = branch_id {
            self.branches.entry(branch_id).or_default().push(appended_index);
        }

        Ok(AppendResult {
            appended_index,
            branches: self.branches.keys().cloned().collect(),
            history_length: self.history.len(),
        })
    }

    pub fn history(&self) -> &[ThoughtRecord] {
        &self.history
    }

    pub fn branch(&self, branch_id: &str) -> Option<&[usize]> {
        self.branches.get(branch_id).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u32, total: u32) -> ThoughtRecord {
        ThoughtRecord {
            thought: format!("step {n}"),
            thought_number: n,
            total_thoughts: total,
            next_thought_needed: true,
            is_revision: None,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            needs_more_thoughts: None,
        }
    }

    #[test]
    fn total_thoughts_grows_on_demand() {
        let mut log = ThoughtLog::default();
        let result = log.append(record(3, 1)).unwrap();
        assert_eq!(result.history_length, 1);
        assert_eq!(log.history()[0].total_thoughts, 3);
    }

    #[test]
    fn rejects_zero_thought_number() {
        let mut log = ThoughtLog::default();
        let err = log.append(record(0, 1)).unwrap_err();
        assert_eq!(err.code(), "BadArguments");
    }

    #[test]
    fn branch_sequence_tracks_its_own_indices() {
        let mut log = ThoughtLog::default();
        log.append(record(1, 1)).unwrap();
        let mut branched = record(2, 2);
        branched.branch_id = Some("alt".to_string());
        branched.branch_from_thought = Some(1);
        let result = log.append(branched).unwrap();

        assert_eq!(result.branches, vec!["alt".to_string()]);
        assert_eq!(log.branch("alt"), Some(&[2usize][..]));
        assert_eq!(log.history().len(), 2);
    }

    #[test]
    fn revisions_append_rather_than_mutate() {
        let mut log = ThoughtLog::default();
        log.append(record(1, 2)).unwrap();
        let mut revision = record(2, 2);
        revision.is_revision = Some(true);
        revision.revises_thought = Some(1);
        log.append(revision).unwrap();

        assert_eq!(log.history().len(), 2);
        assert_eq!(log.history()[1].revises_thought, Some(1));
    }
}
