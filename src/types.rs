//! Shared types used across modules
//!
//! Tickets, reflections and their search results. These are the shapes
//! persisted to disk and returned over the tool boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a reasoning ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Completed,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Active => write!(f, "active"),
            TicketStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One in-flight or finished reasoning cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTicket {
    pub id: String,
    pub workspace_path: String,
    pub task_description: String,
    pub status: TicketStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ReasoningTicket {
    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Active
    }
}

/// How a reasoning cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Parse from the wire string ("success" / "failure")
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "success" => Some(Outcome::Success),
            "failure" => Some(Outcome::Failure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logged lesson tied to a completed ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub ticket_id: String,
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub outcome: Outcome,
    pub learning: String,
}

/// A reflection returned from a search, with its relevance score
///
/// Lower scores are better; 0.0 is an exact match. Global searches tag each
/// hit with the namespace it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredReflection {
    #[serde(flatten)]
    pub reflection: Reflection,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse() {
        assert_eq!(Outcome::from_str_opt("success"), Some(Outcome::Success));
        assert_eq!(Outcome::from_str_opt(" FAILURE "), Some(Outcome::Failure));
        assert_eq!(Outcome::from_str_opt("partial"), None);
    }

    #[test]
    fn test_ticket_serializes_created_at_in_camel_case() {
        let ticket = ReasoningTicket {
            id: "abc".to_string(),
            workspace_path: "/proj".to_string(),
            task_description: "fix bug".to_string(),
            status: TicketStatus::Active,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["status"], "active");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_scored_reflection_flattens() {
        let scored = ScoredReflection {
            reflection: Reflection {
                ticket_id: "t1".to_string(),
                timestamp: Utc::now(),
                task: "task".to_string(),
                outcome: Outcome::Success,
                learning: "lesson".to_string(),
            },
            score: 0.25,
            namespace: None,
            workspace_path: None,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["ticket_id"], "t1");
        assert_eq!(json["outcome"], "success");
        assert!(json.get("namespace").is_none());
    }
}
