//! Tool definitions for the reasoning server
//!
//! This module defines the tools advertised to the agent, validates their
//! arguments and dispatches them to the lifecycle coordinator.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::reasoning::instructions::{
    BEGIN_TOOL, COMPLETE_TOOL, REVERT_TOOL, SEARCH_GLOBAL_TOOL, SEARCH_LOCAL_TOOL,
};
use crate::reasoning::{ReasoningError, ReasoningResult, TicketLifecycleCoordinator};
use crate::types::Outcome;

/// Largest result limit a caller may request
const MAX_SEARCH_LIMIT: u64 = 100;

/// Tool definition as advertised over `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool execution context
#[derive(Clone)]
pub struct ToolContext {
    pub coordinator: Arc<TicketLifecycleCoordinator>,
    pub config: Config,
}

impl ToolContext {
    pub fn new(coordinator: Arc<TicketLifecycleCoordinator>, config: Config) -> Self {
        Self { coordinator, config }
    }
}

/// Tool call from the agent
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Tool execution result
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Tools available to the agent
pub fn builtin_tools(config: &Config) -> Vec<Tool> {
    vec![
        Tool {
            name: BEGIN_TOOL.to_string(),
            description: format!(
                "Start a reasoning cycle for a workspace. Takes a token budget and returns an instruction \
                 for the <think> block, including the reasoning ticket id to use when logging the outcome. \
                 Only one cycle may be active per workspace. Budget defaults to {} tokens.",
                config.reasoning.default_token_budget
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "workspace_path": {
                        "type": "string",
                        "description": "Absolute path of the workspace the task belongs to"
                    },
                    "task_description": {
                        "type": "string",
                        "description": "What this reasoning cycle is about"
                    },
                    "token_budget": {
                        "type": "number",
                        "description": "The maximum number of tokens allowed for the <think> block",
                        "exclusiveMinimum": 0,
                        "maximum": config.reasoning.max_token_budget
                    }
                },
                "required": ["workspace_path", "task_description"]
            }),
        },
        Tool {
            name: COMPLETE_TOOL.to_string(),
            description: "Finish the active reasoning cycle and record a concise lesson learned. \
                The most recent 20 reflections per workspace are kept.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "workspace_path": { "type": "string" },
                    "reasoning_ticket_id": {
                        "type": "string",
                        "description": "Ticket id returned when the cycle started"
                    },
                    "task": { "type": "string" },
                    "outcome": { "type": "string", "enum": ["success", "failure"] },
                    "learning": {
                        "type": "string",
                        "description": "A concise lesson learned from the reasoning cycle"
                    }
                },
                "required": ["workspace_path", "reasoning_ticket_id", "task", "outcome", "learning"]
            }),
        },
        Tool {
            name: SEARCH_LOCAL_TOOL.to_string(),
            description: "Fuzzy-search past reflections for this workspace. Any word of the query may match. \
                Returns reflections ranked by score (lower is better, 0 is exact).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "workspace_path": { "type": "string" },
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_SEARCH_LIMIT }
                },
                "required": ["workspace_path", "query"]
            }),
        },
        Tool {
            name: SEARCH_GLOBAL_TOOL.to_string(),
            description: "Fuzzy-search past reflections across all workspaces. Matches the query as a phrase. \
                Each result names the workspace it came from.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_SEARCH_LIMIT }
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: REVERT_TOOL.to_string(),
            description: "Undo a reasoning cycle: removes the ticket and its reflection, if any. \
                Reverting an unknown ticket does nothing.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "workspace_path": { "type": "string" },
                    "reasoning_ticket_id": { "type": "string" }
                },
                "required": ["workspace_path", "reasoning_ticket_id"]
            }),
        },
    ]
}

/// Whether a tool with this name exists
pub fn is_known_tool(name: &str) -> bool {
    matches!(
        name,
        BEGIN_TOOL | COMPLETE_TOOL | SEARCH_LOCAL_TOOL | SEARCH_GLOBAL_TOOL | REVERT_TOOL
    )
}

/// Execute a tool call; failures become an unsuccessful result, never a panic
pub fn execute_tool(call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    match execute_tool_inner(call, ctx) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Tool {} failed: {}", call.name, e);
            ToolResult {
                success: false,
                message: format!("Error in tool {}: {}", call.name, e),
                data: None,
            }
        }
    }
}

fn execute_tool_inner(call: &ToolCall, ctx: &ToolContext) -> ReasoningResult<ToolResult> {
    let args = &call.arguments;
    let coordinator = &ctx.coordinator;

    match call.name.as_str() {
        BEGIN_TOOL => {
            let workspace = required_str(args, "workspace_path")?;
            let task = required_str(args, "task_description")?;
            let budget = token_budget(args, ctx.config.reasoning.max_token_budget)?;

            let begun = coordinator.begin(workspace, task, budget)?;
            Ok(ToolResult {
                success: true,
                message: begun.instruction,
                data: Some(json!({
                    "reasoning_ticket_id": begun.ticket.id,
                    "token_budget": begun.token_budget,
                })),
            })
        }
        COMPLETE_TOOL => {
            let workspace = required_str(args, "workspace_path")?;
            let ticket_id = required_str(args, "reasoning_ticket_id")?;
            let task = required_str(args, "task")?;
            let outcome_raw = required_str(args, "outcome")?;
            let outcome = Outcome::from_str_opt(outcome_raw).ok_or_else(|| {
                ReasoningError::validation(format!(
                    "outcome must be \"success\" or \"failure\", got \"{}\"",
                    outcome_raw
                ))
            })?;
            let learning = required_str(args, "learning")?;

            let reflection = coordinator.complete(workspace, ticket_id, task, outcome, learning)?;
            Ok(ToolResult {
                success: true,
                message: format!(
                    "Reflection logged for reasoning ticket {} ({}). The workspace is ready for a new reasoning cycle.",
                    reflection.ticket_id, reflection.outcome
                ),
                data: None,
            })
        }
        SEARCH_LOCAL_TOOL => {
            let workspace = required_str(args, "workspace_path")?;
            let query = required_str(args, "query")?;
            let limit = search_limit(args, ctx.config.search.default_limit)?;

            let hits = coordinator.search_local(workspace, query, limit)?;
            search_result(&hits)
        }
        SEARCH_GLOBAL_TOOL => {
            let query = required_str(args, "query")?;
            let limit = search_limit(args, ctx.config.search.default_limit)?;

            let hits = coordinator.search_global(query, limit)?;
            search_result(&hits)
        }
        REVERT_TOOL => {
            let workspace = required_str(args, "workspace_path")?;
            let ticket_id = required_str(args, "reasoning_ticket_id")?;

            let reverted = coordinator.revert(workspace, ticket_id)?;
            let message = if reverted.removed_anything() {
                format!(
                    "Reverted reasoning ticket {} (ticket removed: {}, reflection removed: {}).",
                    ticket_id, reverted.ticket_removed, reverted.reflection_removed
                )
            } else {
                format!("Nothing to revert for reasoning ticket {}.", ticket_id)
            };
            Ok(ToolResult {
                success: true,
                message,
                data: Some(json!(reverted)),
            })
        }
        other => Err(ReasoningError::validation(format!("Unknown tool: {}", other))),
    }
}

fn search_result(hits: &[crate::types::ScoredReflection]) -> ReasoningResult<ToolResult> {
    let message = serde_json::to_string_pretty(hits)
        .map_err(|source| ReasoningError::Encode {
            what: "search results".to_string(),
            source,
        })?;
    Ok(ToolResult {
        success: true,
        message,
        data: None,
    })
}

fn required_str<'a>(args: &'a Value, key: &str) -> ReasoningResult<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(ReasoningError::validation(format!("{} must not be empty", key))),
        Some(_) => Err(ReasoningError::validation(format!("{} must be a string", key))),
        None => Err(ReasoningError::validation(format!("missing required field {}", key))),
    }
}

fn token_budget(args: &Value, max: u32) -> ReasoningResult<Option<u32>> {
    let Some(raw) = args.get("token_budget").filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let Some(budget) = raw.as_f64() else {
        return Err(ReasoningError::validation("token_budget must be a number"));
    };
    if !(budget > 0.0) {
        return Err(ReasoningError::validation("token_budget must be positive"));
    }
    if budget > max as f64 {
        return Err(ReasoningError::validation(format!(
            "token_budget must not exceed {}",
            max
        )));
    }
    Ok(Some(budget.ceil() as u32))
}

fn search_limit(args: &Value, default: usize) -> ReasoningResult<usize> {
    let Some(raw) = args.get("limit").filter(|v| !v.is_null()) else {
        return Ok(default);
    };
    match raw.as_u64() {
        Some(limit) if (1..=MAX_SEARCH_LIMIT).contains(&limit) => Ok(limit as usize),
        _ => Err(ReasoningError::validation(format!(
            "limit must be an integer between 1 and {}",
            MAX_SEARCH_LIMIT
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::MemoryDocumentStore;

    fn ctx() -> ToolContext {
        let config = Config::default();
        let coordinator = TicketLifecycleCoordinator::new(Arc::new(MemoryDocumentStore::new()), &config);
        ToolContext::new(Arc::new(coordinator), config)
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_builtin_tools_are_known() {
        let tools = builtin_tools(&Config::default());
        assert_eq!(tools.len(), 5);
        for tool in &tools {
            assert!(is_known_tool(&tool.name), "{} not dispatchable", tool.name);
            assert_eq!(tool.input_schema["type"], "object");
        }
        assert!(!is_known_tool("read_file"));
    }

    #[test]
    fn test_begin_returns_ticket_in_instruction() {
        let ctx = ctx();
        let result = execute_tool(
            &call(BEGIN_TOOL, json!({"workspace_path": "/proj", "task_description": "fix bug", "token_budget": 1000})),
            &ctx,
        );
        assert!(result.success, "{}", result.message);
        let data = result.data.unwrap();
        let id = data["reasoning_ticket_id"].as_str().unwrap();
        assert!(result.message.contains(id));
        assert!(result.message.contains("1000 tokens"));
        assert_eq!(data["token_budget"], 1000);
    }

    #[test]
    fn test_validation_errors() {
        let ctx = ctx();
        let cases = vec![
            json!({"task_description": "t"}),
            json!({"workspace_path": "", "task_description": "t"}),
            json!({"workspace_path": 5, "task_description": "t"}),
            json!({"workspace_path": "/p", "task_description": "t", "token_budget": 0}),
            json!({"workspace_path": "/p", "task_description": "t", "token_budget": 9000}),
            json!({"workspace_path": "/p", "task_description": "t", "token_budget": "lots"}),
        ];
        for args in cases {
            let result = execute_tool(&call(BEGIN_TOOL, args.clone()), &ctx);
            assert!(!result.success, "accepted {}", args);
            assert!(result.message.contains("Invalid input"), "{}", result.message);
        }
        // Nothing was started by the rejected calls
        assert!(ctx.coordinator.tickets("/p").unwrap().is_empty());
    }

    #[test]
    fn test_bad_outcome_rejected() {
        let ctx = ctx();
        let result = execute_tool(
            &call(COMPLETE_TOOL, json!({
                "workspace_path": "/proj",
                "reasoning_ticket_id": "x",
                "task": "t",
                "outcome": "maybe",
                "learning": "l"
            })),
            &ctx,
        );
        assert!(!result.success);
        assert!(result.message.contains("outcome"));
    }

    #[test]
    fn test_cycle_through_tools() {
        let ctx = ctx();
        let begun = execute_tool(
            &call(BEGIN_TOOL, json!({"workspace_path": "/proj", "task_description": "fix bug"})),
            &ctx,
        );
        let id = begun.data.unwrap()["reasoning_ticket_id"].as_str().unwrap().to_string();

        let conflict = execute_tool(
            &call(BEGIN_TOOL, json!({"workspace_path": "/proj", "task_description": "other"})),
            &ctx,
        );
        assert!(!conflict.success);
        assert!(conflict.message.contains(&id));

        let completed = execute_tool(
            &call(COMPLETE_TOOL, json!({
                "workspace_path": "/proj",
                "reasoning_ticket_id": id,
                "task": "fix bug",
                "outcome": "success",
                "learning": "check null before deref"
            })),
            &ctx,
        );
        assert!(completed.success, "{}", completed.message);

        let found = execute_tool(
            &call(SEARCH_LOCAL_TOOL, json!({"workspace_path": "/proj", "query": "null deref", "limit": 5})),
            &ctx,
        );
        assert!(found.success);
        let hits: Vec<Value> = serde_json::from_str(&found.message).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["learning"], "check null before deref");
        assert!(hits[0]["score"].as_f64().is_some());

        let global = execute_tool(&call(SEARCH_GLOBAL_TOOL, json!({"query": "check null"})), &ctx);
        let hits: Vec<Value> = serde_json::from_str(&global.message).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0]["namespace"].is_string());
        assert_eq!(hits[0]["workspace_path"], "/proj");

        let reverted = execute_tool(
            &call(REVERT_TOOL, json!({"workspace_path": "/proj", "reasoning_ticket_id": id})),
            &ctx,
        );
        assert!(reverted.success);
        assert!(reverted.message.starts_with("Reverted"));

        let again = execute_tool(
            &call(REVERT_TOOL, json!({"workspace_path": "/proj", "reasoning_ticket_id": id})),
            &ctx,
        );
        assert!(again.success);
        assert!(again.message.starts_with("Nothing to revert"));
    }

    #[test]
    fn test_search_limit_validation() {
        let ctx = ctx();
        let result = execute_tool(&call(SEARCH_GLOBAL_TOOL, json!({"query": "x", "limit": 0})), &ctx);
        assert!(!result.success);
        let result = execute_tool(&call(SEARCH_GLOBAL_TOOL, json!({"query": "x"})), &ctx);
        assert!(result.success);
        assert_eq!(result.message, "[]");
    }
}
