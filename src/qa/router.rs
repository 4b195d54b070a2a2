//! Deterministic question router: classify, then dispatch. No state across
//! calls.

use std::sync::Arc;

use crate::qa::QueryContext;
use crate::qa::classifier::{QuestionClassifier, QuestionKind};
use crate::qa::strategy::AnswerStrategy;

#[derive(Debug)]
pub struct QuestionRouter {
    classifier: QuestionClassifier,
    budgeting: Arc<dyn AnswerStrategy>,
    education: Arc<dyn AnswerStrategy>,
}

impl QuestionRouter {
    #[must_use]
    pub fn new(
        classifier: QuestionClassifier,
        budgeting: Arc<dyn AnswerStrategy>,
        education: Arc<dyn AnswerStrategy>,
    ) -> Self {
        Self {
            classifier,
            budgeting,
            education,
        }
    }

    /// Classify the question and run the matching strategy.
    pub async fn route(&self, ctx: &QueryContext, question: &str) -> String {
        let kind = self.classifier.classify(question).await;
        tracing::info!(
            name: "qa.routed",
            user_id = %ctx.user_id,
            kind = kind.as_str(),
            "Question routed"
        );

        match kind {
            QuestionKind::Budgeting => self.budgeting.answer(ctx, question).await,
            QuestionKind::Education => self.education.answer(ctx, question).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRequest, Completion, GenerationService};
    use async_trait::async_trait;

    /// Answers classification prompts with a fixed label.
    #[derive(Debug)]
    struct LabelLlm(&'static str);

    #[async_trait]
    impl GenerationService for LabelLlm {
        async fn complete(&self, _req: ChatRequest) -> anyhow::Result<Completion> {
            Ok(Completion {
                content: Some(self.0.to_string()),
                tool_calls: Vec::new(),
            })
        }
    }

    #[derive(Debug)]
    struct NamedStrategy(&'static str);

    #[async_trait]
    impl AnswerStrategy for NamedStrategy {
        async fn answer(&self, _ctx: &QueryContext, _question: &str) -> String {
            self.0.to_string()
        }
    }

    fn router(label: &'static str) -> QuestionRouter {
        QuestionRouter::new(
            QuestionClassifier::new(Arc::new(LabelLlm(label))),
            Arc::new(NamedStrategy("budgeting answer")),
            Arc::new(NamedStrategy("education answer")),
        )
    }

    #[tokio::test]
    async fn test_budgeting_label_dispatches_to_budgeting() {
        let answer = router("budgeting")
            .route(&QueryContext::new("alice"), "how much did I spend?")
            .await;
        assert_eq!(answer, "budgeting answer");
    }

    #[tokio::test]
    async fn test_unknown_label_dispatches_to_education() {
        let answer = router("no idea, sorry")
            .route(&QueryContext::new("alice"), "how much did I spend?")
            .await;
        assert_eq!(answer, "education answer");
    }
}
