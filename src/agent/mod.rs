//! Agentic query path.
//!
//! The runner exposes the answering strategies as named tools and drives a
//! bounded tool loop against the generation service:
//!
//! 1. Send the transcript and tool schemas to the model
//! 2. If the model requests tool calls, execute them and feed the results
//!    back as tool messages
//! 3. Repeat until the model produces a final text answer
//!
//! The loop is capped at [`MAX_TOOL_ITERATIONS`] to guarantee termination.
//! Tool failures become error-text observations, never a crash of the loop.

pub mod memory;
pub mod tools;

use std::sync::Arc;

use uuid::Uuid;

use crate::llm::{ChatRequest, GenerationService};
use crate::qa::QueryContext;
use memory::ConversationMemory;
use tools::{AgentTool, openai_tools_json};

/// Maximum number of tool loop iterations to prevent infinite loops.
const MAX_TOOL_ITERATIONS: usize = 6;

const SYSTEM_PROMPT: &str = "You are a personal finance assistant. Use the \
personal_budgeting tool for questions about the user's own transactions and \
the financial_education tool for general financial questions. Answer with \
plain text once you have what you need.";

/// Drives one bounded tool loop per request.
pub struct AgentRunner {
    llm: Arc<dyn GenerationService>,
    tools: Vec<Arc<dyn AgentTool>>,
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("tool_count", &self.tools.len())
            .finish()
    }
}

impl AgentRunner {
    #[must_use]
    pub fn new(llm: Arc<dyn GenerationService>, tools: Vec<Arc<dyn AgentTool>>) -> Self {
        Self { llm, tools }
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Run the agent loop for one question.
    ///
    /// # Errors
    ///
    /// Fails when the generation service is unreachable or the loop hits
    /// its iteration cap without a final answer.
    pub async fn run(&self, ctx: &QueryContext, question: &str) -> anyhow::Result<String> {
        let run_id = Uuid::new_v4().to_string();
        let tools_json = openai_tools_json(&self.tools);

        // Memory is scoped to this run; nothing carries over between requests.
        let mut memory = ConversationMemory::with_system_prompt(SYSTEM_PROMPT);
        memory.add_user_message(question);

        tracing::info!(
            name: "agent.run.started",
            run_id = %run_id,
            user_id = %ctx.user_id,
            tool_count = self.tools.len(),
            "Agent run started"
        );

        for iteration in 1..=MAX_TOOL_ITERATIONS {
            let completion = self
                .llm
                .complete(ChatRequest {
                    messages: memory.messages(),
                    tools: tools_json.clone(),
                })
                .await?;

            if completion.tool_calls.is_empty() {
                let answer = completion
                    .text()
                    .map_or_else(
                        || "I'm unable to provide a response right now.".to_string(),
                        ToString::to_string,
                    );
                tracing::info!(
                    name: "agent.run.finished",
                    run_id = %run_id,
                    iteration = iteration,
                    "Agent produced final answer"
                );
                return Ok(answer);
            }

            let tool_calls = completion.tool_calls;
            memory.add_assistant_with_tool_calls(completion.content.clone(), tool_calls.clone());

            for tool_call in &tool_calls {
                let tool_name = &tool_call.function.name;
                let arguments: serde_json::Value =
                    serde_json::from_str(&tool_call.function.arguments)
                        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

                tracing::info!(
                    run_id = %run_id,
                    iteration = iteration,
                    tool_name = %tool_name,
                    "Executing tool call"
                );

                let observation = match self.find_tool(tool_name) {
                    Some(tool) => match tool.call(ctx, arguments).await {
                        Ok(result) => serde_json::to_string(&result).unwrap_or_default(),
                        Err(e) => {
                            tracing::warn!(
                                run_id = %run_id,
                                tool_name = %tool_name,
                                error = %e,
                                "Tool call failed"
                            );
                            format!("Error: {e}")
                        }
                    },
                    None => {
                        tracing::warn!(
                            run_id = %run_id,
                            tool_name = %tool_name,
                            "Unknown tool requested"
                        );
                        format!("Error: unknown tool '{tool_name}'")
                    }
                };

                memory.add_tool_result(tool_call.id.clone(), observation);
            }
        }

        tracing::error!(
            run_id = %run_id,
            max_iterations = MAX_TOOL_ITERATIONS,
            "Maximum tool loop iterations exceeded"
        );
        Err(anyhow::anyhow!(
            "agent exceeded maximum tool iterations ({MAX_TOOL_ITERATIONS})"
        ))
    }
}
