//! Question classifier.
//!
//! Sends a fixed instruction template plus the question to the generation
//! service and expects exactly one of two lowercase labels back. Anything
//! else, including a service failure, defaults to education: general
//! answering needs no per-user state and cannot leak or corrupt anything.

use std::sync::Arc;

use crate::llm::{ChatRequest, GenerationService};

/// The two answering categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Needs the user's own transaction history.
    Budgeting,
    /// General financial knowledge, no personal context.
    Education,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Budgeting => "budgeting",
            Self::Education => "education",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuestionClassifier {
    llm: Arc<dyn GenerationService>,
}

impl QuestionClassifier {
    #[must_use]
    pub fn new(llm: Arc<dyn GenerationService>) -> Self {
        Self { llm }
    }

    /// Classify a question as budgeting or education.
    pub async fn classify(&self, question: &str) -> QuestionKind {
        let prompt = format!(
            "Classify the following statement into one of the two categories:\n\
             \n\
             - \"budgeting\"\n\
             - \"education\"\n\
             \n\
             \"budgeting\" means the statement is about the user's own income, \
             spending or transaction history. \"education\" means it is a general \
             financial knowledge question.\n\
             \n\
             Return only one of these two options in lowercase without any \
             additional text.\n\
             \n\
             Statement: {question}"
        );

        match self.llm.complete(ChatRequest::prompt(prompt)).await {
            Ok(completion) => {
                let label = completion.text().unwrap_or_default().to_string();
                let kind = parse_label(&label);
                tracing::debug!(label = %label.trim(), kind = kind.as_str(), "Question classified");
                kind
            }
            Err(e) => {
                tracing::warn!(error = %e, "Classifier call failed, defaulting to education");
                QuestionKind::Education
            }
        }
    }
}

/// Map a raw model response onto a category. Unrecognized responses default
/// to education.
fn parse_label(raw: &str) -> QuestionKind {
    match raw.trim().to_lowercase().as_str() {
        "budgeting" => QuestionKind::Budgeting,
        _ => QuestionKind::Education,
    }
}
