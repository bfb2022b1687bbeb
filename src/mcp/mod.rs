//! MCP server over stdio
//!
//! Newline-delimited JSON-RPC 2.0 on stdin/stdout. Requests are handled one at
//! a time; logging goes to stderr so stdout carries only protocol frames.

pub mod tools;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use tools::{builtin_tools, execute_tool, is_known_tool, ToolCall, ToolContext};

/// Server name reported during `initialize`
pub const SERVER_NAME: &str = "systematic-reasoning-ai-mcp";
/// Protocol revision this server speaks
pub const MCP_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, rename = "jsonrpc")]
    pub _jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

pub fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Protocol state for one client connection
pub struct McpServer {
    ctx: ToolContext,
    initialized: bool,
}

impl McpServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            initialized: false,
        }
    }

    /// Handle one request; `None` for notifications
    pub fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();

        if method == "initialize" {
            return Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": MCP_VERSION,
                    "serverInfo": { "name": SERVER_NAME, "version": crate::VERSION },
                    "capabilities": { "tools": {} }
                }),
            ));
        }

        if method == "notifications/initialized" {
            self.initialized = true;
            return None;
        }

        if request.id.is_none() {
            debug!("Ignoring notification {}", method);
            return None;
        }

        if !self.initialized {
            return Some(json_rpc_error(request.id, -32002, "Server not initialized"));
        }

        match method {
            "ping" => Some(json_rpc_response(request.id, json!({}))),
            "tools/list" => Some(json_rpc_response(
                request.id,
                json!({ "tools": builtin_tools(&self.ctx.config) }),
            )),
            "tools/call" => Some(self.call_tool(request.id, request.params)),
            _ => Some(json_rpc_error(
                request.id,
                -32601,
                &format!("Method not found: {}", method),
            )),
        }
    }

    fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> Value {
        let call = match params.map(serde_json::from_value::<ToolCall>) {
            Some(Ok(call)) => call,
            _ => return json_rpc_error(id, -32602, "params must be an object with a tool name"),
        };

        if !is_known_tool(&call.name) {
            return json_rpc_error(id, -32601, &format!("Tool not found: {}", call.name));
        }

        let result = execute_tool(&call, &self.ctx);
        let mut body = json!({
            "content": [{ "type": "text", "text": result.message }],
            "isError": !result.success
        });
        if let Some(data) = result.data {
            body["structuredContent"] = data;
        }
        json_rpc_response(id, body)
    }

    /// Handle one raw input line
    pub fn handle_line(&mut self, line: &str) -> Option<Value> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Unparseable request: {}", e);
                Some(json_rpc_error(None, -32700, &format!("Parse error: {}", e)))
            }
        }
    }
}

/// Serve requests from stdin until it closes
pub async fn serve_stdio(mut server: McpServer) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!("[{}] Server running on stdio.", SERVER_NAME);

    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = server.handle_line(&line) {
            let mut frame = serde_json::to_vec(&response).context("Failed to encode response")?;
            frame.push(b'\n');
            stdout.write_all(&frame).await.context("Failed to write to stdout")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }
    }

    info!("[{}] stdin closed, shutting down.", SERVER_NAME);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::reasoning::{MemoryDocumentStore, TicketLifecycleCoordinator};
    use std::sync::Arc;

    fn server() -> McpServer {
        let config = Config::default();
        let coordinator = TicketLifecycleCoordinator::new(Arc::new(MemoryDocumentStore::new()), &config);
        McpServer::new(ToolContext::new(Arc::new(coordinator), config))
    }

    fn initialized() -> McpServer {
        let mut server = server();
        server.handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .is_none());
        server
    }

    #[test]
    fn test_initialize_reports_server_info() {
        let mut server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(response["result"]["protocolVersion"], MCP_VERSION);
    }

    #[test]
    fn test_requests_before_initialized_are_rejected() {
        let mut server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .unwrap();
        assert_eq!(response["error"]["code"], -32002);
    }

    #[test]
    fn test_tools_list() {
        let mut server = initialized();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[test]
    fn test_tool_error_is_flagged_not_fatal() {
        let mut server = initialized();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"log_reasoning_reflection","arguments":{"workspace_path":"/p","reasoning_ticket_id":"nope","task":"t","outcome":"success","learning":"l"}}}"#)
            .unwrap();
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("nope"));

        // Server keeps answering afterwards
        let ping = server.handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#).unwrap();
        assert!(ping.get("result").is_some());
    }

    #[test]
    fn test_begin_via_tools_call() {
        let mut server = initialized();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"set_reasoning_budget","arguments":{"workspace_path":"/proj","task_description":"fix bug","token_budget":1000}}}"#)
            .unwrap();
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Reasoning ticket"));
        assert!(text.contains("1000 tokens"));

        let structured = &response["result"]["structuredContent"];
        let id = structured["reasoning_ticket_id"].as_str().unwrap();
        assert!(text.contains(id));
        assert_eq!(structured["token_budget"], 1000);
    }

    #[test]
    fn test_revert_via_tools_call_reports_what_was_removed() {
        let mut server = initialized();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"revert_reasoning_cycle","arguments":{"workspace_path":"/proj","reasoning_ticket_id":"missing"}}}"#)
            .unwrap();
        assert_eq!(response["result"]["isError"], false);
        assert_eq!(response["result"]["structuredContent"]["ticket_removed"], false);
        assert_eq!(response["result"]["structuredContent"]["reflection_removed"], false);
    }

    #[test]
    fn test_search_via_tools_call_is_text_only() {
        let mut server = initialized();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"search_global_reflections","arguments":{"query":"anything"}}}"#)
            .unwrap();
        assert_eq!(response["result"]["isError"], false);
        assert!(response["result"].get("structuredContent").is_none());
    }

    #[test]
    fn test_unknown_tool_and_method() {
        let mut server = initialized();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"read_file","arguments":{}}}"#)
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"resources/subscribe"}"#)
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[test]
    fn test_parse_error() {
        let mut server = server();
        let response = server.handle_line("{not json").unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());
    }
}
