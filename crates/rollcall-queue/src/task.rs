//! Task and payload types.

use rollcall_core::RegionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which crawl step a task drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Fetch the search form and extract its tokens
    SearchPage,
    /// Submit/continue a search and fan out over its result rows
    ResultsPage,
    /// Fetch and parse one detail page
    DetailPage,
    /// Fan out over a disambiguation listing
    Disambiguation,
}

impl TaskType {
    /// Stable storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchPage => "search_page",
            Self::ResultsPage => "results_page",
            Self::DetailPage => "detail_page",
            Self::Disambiguation => "disambiguation",
        }
    }

    /// Parse a stable storage name.
    #[must_use]
    pub fn from_str_opt(raw: &str) -> Option<Self> {
        match raw {
            "search_page" => Some(Self::SearchPage),
            "results_page" => Some(Self::ResultsPage),
            "detail_page" => Some(Self::DetailPage),
            "disambiguation" => Some(Self::Disambiguation),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a crawl step needs to run, carried through the queue.
///
/// The `form` map is opaque echoed form state from the previous page;
/// the queue and engine never interpret it, only the region adapter does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Search surname, present on search/results tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    /// Search given names, present on search/results tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_names: Option<String>,
    /// Echoed form state for the next POST
    #[serde(default)]
    pub form: HashMap<String, String>,
    /// Whether this is the first results page of a search
    #[serde(default)]
    pub first_page: bool,
    /// Disambiguation group id shared by sibling detail tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Record ids named by the same disambiguation page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_records: Vec<String>,
}

/// A unit of crawl work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique task identifier
    pub id: String,
    /// Region partition this task belongs to
    pub region: RegionId,
    /// Which crawl step to run
    pub task_type: TaskType,
    /// Step parameters
    pub payload: TaskPayload,
}

impl Task {
    /// Create a task with a fresh id.
    #[must_use]
    pub fn new(region: RegionId, task_type: TaskType, payload: TaskPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            region,
            task_type,
            payload,
        }
    }
}

/// A task handed to a worker under a visibility timeout.
#[derive(Debug, Clone)]
pub struct LeasedTask {
    /// The leased task
    pub task: Task,
    /// How many times this task has been leased, including this lease
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_names_round_trip() {
        for task_type in [
            TaskType::SearchPage,
            TaskType::ResultsPage,
            TaskType::DetailPage,
            TaskType::Disambiguation,
        ] {
            assert_eq!(TaskType::from_str_opt(task_type.as_str()), Some(task_type));
        }
        assert_eq!(TaskType::from_str_opt("bogus"), None);
    }

    #[test]
    fn test_payload_json_round_trip() {
        let payload = TaskPayload {
            surname: Some("SIMPSON".to_string()),
            given_names: Some("HOMER".to_string()),
            form: HashMap::from([("K01".to_string(), "abc".to_string())]),
            first_page: true,
            group_id: None,
            linked_records: vec!["1234567a".to_string()],
        };

        let json = serde_json::to_string(&payload).expect("serialize");
        let back: TaskPayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, payload);
    }
}
