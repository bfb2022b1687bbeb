//! Instruction text handed back when a reasoning cycle begins

/// Tool that opens a reasoning cycle
pub const BEGIN_TOOL: &str = "set_reasoning_budget";
/// Tool that closes a cycle with a reflection
pub const COMPLETE_TOOL: &str = "log_reasoning_reflection";
/// Tool that searches this workspace's reflections
pub const SEARCH_LOCAL_TOOL: &str = "search_reasoning_reflections";
/// Tool that searches reflections from every workspace
pub const SEARCH_GLOBAL_TOOL: &str = "search_global_reflections";
/// Tool that undoes a cycle
pub const REVERT_TOOL: &str = "revert_reasoning_cycle";

/// Compose the begin response for a freshly opened ticket
pub fn begin_instruction(ticket_id: &str, token_budget: u32) -> String {
    format!(
        "Reasoning ticket {ticket_id} is now active for this workspace.

Before acting, consult what has been learned already: call `{SEARCH_LOCAL_TOOL}` with this workspace and keywords from your task, and `{SEARCH_GLOBAL_TOOL}` for lessons from other workspaces.

You MUST use a <think> block for your reasoning, and it must not exceed {token_budget} tokens. Example format:
<think>
- Goal: [Your primary goal for this task]
- Assumptions: [List of assumptions you are making]
- Risk: [The main risk or potential issue]
</think>

When the task is done, call `{COMPLETE_TOOL}` with reasoning_ticket_id \"{ticket_id}\", the outcome (success or failure) and one concise lesson learned. To abandon this cycle instead, call `{REVERT_TOOL}` with the same ticket id."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_embeds_ticket_and_budget() {
        let text = begin_instruction("0b7c3f5e-1111-4222-8333-444455556666", 1000);
        assert!(text.contains("0b7c3f5e-1111-4222-8333-444455556666"));
        assert!(text.contains("must not exceed 1000 tokens"));
        assert!(text.contains("<think>"));
        assert!(text.contains(SEARCH_LOCAL_TOOL));
        assert!(text.contains(SEARCH_GLOBAL_TOOL));
        assert!(text.contains(COMPLETE_TOOL));
        assert!(text.contains(REVERT_TOOL));
    }
}
