//! Tools exposed to the agent loop.
//!
//! Each tool wraps an answering strategy and receives the per-request
//! [`QueryContext`] explicitly, rather than closing over a user id.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::qa::QueryContext;
use crate::qa::strategy::AnswerStrategy;

/// A tool the agent can invoke.
#[async_trait]
pub trait AgentTool: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;
    async fn call(
        &self,
        ctx: &QueryContext,
        args: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Render a tool list as OpenAI function schemas.
#[must_use]
pub fn openai_tools_json(tools: &[Arc<dyn AgentTool>]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.schema()
                }
            })
        })
        .collect()
}

fn question_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "question": {
                "type": "string",
                "description": "The question to answer."
            }
        },
        "required": ["question"]
    })
}

async fn answer_with(
    strategy: &Arc<dyn AnswerStrategy>,
    ctx: &QueryContext,
    args: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let question = args["question"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing question"))?;
    let answer = strategy.answer(ctx, question).await;
    Ok(json!({ "answer": answer }))
}

/// Analyzes questions about the user's own transactions.
#[derive(Debug)]
pub struct BudgetingTool {
    strategy: Arc<dyn AnswerStrategy>,
}

impl BudgetingTool {
    #[must_use]
    pub fn new(strategy: Arc<dyn AnswerStrategy>) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl AgentTool for BudgetingTool {
    fn name(&self) -> &str {
        "personal_budgeting"
    }

    fn description(&self) -> &str {
        "Analyze questions about the user's own income, spending and transaction history."
    }

    fn schema(&self) -> serde_json::Value {
        question_schema()
    }

    async fn call(
        &self,
        ctx: &QueryContext,
        args: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        answer_with(&self.strategy, ctx, args).await
    }
}

/// Answers general financial knowledge questions.
#[derive(Debug)]
pub struct EducationTool {
    strategy: Arc<dyn AnswerStrategy>,
}

impl EducationTool {
    #[must_use]
    pub fn new(strategy: Arc<dyn AnswerStrategy>) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl AgentTool for EducationTool {
    fn name(&self) -> &str {
        "financial_education"
    }

    fn description(&self) -> &str {
        "Answer general financial education questions that need no personal data."
    }

    fn schema(&self) -> serde_json::Value {
        question_schema()
    }

    async fn call(
        &self,
        ctx: &QueryContext,
        args: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        answer_with(&self.strategy, ctx, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EchoStrategy;

    #[async_trait]
    impl AnswerStrategy for EchoStrategy {
        async fn answer(&self, _ctx: &QueryContext, question: &str) -> String {
            format!("echo: {question}")
        }
    }

    #[tokio::test]
    async fn test_tool_call_extracts_question() {
        let tool = BudgetingTool::new(Arc::new(EchoStrategy));
        let result = tool
            .call(
                &QueryContext::new("alice"),
                json!({ "question": "how much?" }),
            )
            .await
            .unwrap();
        assert_eq!(result["answer"], "echo: how much?");
    }

    #[tokio::test]
    async fn test_tool_call_missing_question_errors() {
        let tool = EducationTool::new(Arc::new(EchoStrategy));
        let err = tool
            .call(&QueryContext::new("alice"), json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing question"));
    }

    #[test]
    fn test_openai_schema_shape() {
        let tools: Vec<Arc<dyn AgentTool>> = vec![
            Arc::new(BudgetingTool::new(Arc::new(EchoStrategy))),
            Arc::new(EducationTool::new(Arc::new(EchoStrategy))),
        ];
        let rendered = openai_tools_json(&tools);
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0]["type"], "function");
        assert_eq!(rendered[0]["function"]["name"], "personal_budgeting");
        assert_eq!(
            rendered[1]["function"]["parameters"]["required"][0],
            "question"
        );
    }
}
