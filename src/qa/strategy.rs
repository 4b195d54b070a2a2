//! Answering strategies.
//!
//! A strategy is a self-contained answering procedure. Service failures are
//! recovered here and turned into descriptive text for the caller; a query
//! never hard-fails because the model or the store hiccuped.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{ChatRequest, GenerationService};
use crate::qa::QueryContext;
use crate::store::vector::VectorIndexStore;

/// Returned when the model produced no usable text.
const NO_RESPONSE_FALLBACK: &str = "I'm unable to provide a response right now.";

/// Returned by the budgeting strategy for users with no logged transactions.
const NO_DATA_FALLBACK: &str =
    "You haven't logged any transactions yet, so there is no budgeting data to analyze. \
     Log a few transactions first, or ask a general financial question.";

/// Above this many stored documents the budgeting context switches from
/// full history to similarity-ranked top-k.
const MAX_FULL_CONTEXT_DOCS: usize = 64;

/// Number of documents retrieved in the ranked path.
const TOP_K: usize = 16;

/// A self-contained answering procedure selected per question.
#[async_trait]
pub trait AnswerStrategy: Send + Sync + std::fmt::Debug {
    /// Answer the question for this user. Infallible by contract: all
    /// internal failures are rendered into the returned text.
    async fn answer(&self, ctx: &QueryContext, question: &str) -> String;
}

/// Answers from the user's own transaction history.
#[derive(Debug)]
pub struct BudgetingStrategy {
    index: Arc<VectorIndexStore>,
    llm: Arc<dyn GenerationService>,
}

impl BudgetingStrategy {
    #[must_use]
    pub fn new(index: Arc<VectorIndexStore>, llm: Arc<dyn GenerationService>) -> Self {
        Self { index, llm }
    }

    /// Pick the context documents for the prompt.
    ///
    /// Small indexes contribute their full history; past
    /// `MAX_FULL_CONTEXT_DOCS` the strategy ranks by cosine similarity to
    /// the question instead.
    async fn retrieve_context(&self, user_id: &str, question: &str) -> Result<String, String> {
        let index = match self.index.load(user_id).await {
            Ok(index) => index,
            Err(e) if e.is_not_found() => return Err(NO_DATA_FALLBACK.to_string()),
            Err(e) => return Err(format!("Error: {e}")),
        };

        if index.len() <= MAX_FULL_CONTEXT_DOCS {
            return Ok(index.all_documents().join("\n"));
        }

        match self.index.embed_query(question).await {
            Ok(query) => Ok(index.search(&query, TOP_K).join("\n")),
            Err(e) => {
                // Ranking is an optimization; fall back to full history
                // rather than failing the question.
                tracing::warn!(error = %e, "Query embedding failed, using full history");
                Ok(index.all_documents().join("\n"))
            }
        }
    }
}

#[async_trait]
impl AnswerStrategy for BudgetingStrategy {
    async fn answer(&self, ctx: &QueryContext, question: &str) -> String {
        let context = match self.retrieve_context(&ctx.user_id, question).await {
            Ok(c) => c,
            Err(fallback) => return fallback,
        };

        let prompt = format!(
            "{question}\n{context}\nUse the above data to answer the question. \
             If not relevant, generate an appropriate response."
        );

        match self.llm.complete(ChatRequest::prompt(prompt)).await {
            Ok(completion) => completion
                .text()
                .map_or_else(|| NO_RESPONSE_FALLBACK.to_string(), ToString::to_string),
            Err(e) => {
                tracing::warn!(user_id = %ctx.user_id, error = %e, "Budgeting generation failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Answers general financial questions with no retrieval.
#[derive(Debug)]
pub struct EducationStrategy {
    llm: Arc<dyn GenerationService>,
}

impl EducationStrategy {
    #[must_use]
    pub fn new(llm: Arc<dyn GenerationService>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AnswerStrategy for EducationStrategy {
    async fn answer(&self, ctx: &QueryContext, question: &str) -> String {
        match self.llm.complete(ChatRequest::prompt(question)).await {
            Ok(completion) => completion
                .text()
                .map_or_else(|| NO_RESPONSE_FALLBACK.to_string(), ToString::to_string),
            Err(e) => {
                tracing::warn!(user_id = %ctx.user_id, error = %e, "Education generation failed");
                format!("Error: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::llm::Completion;
    use std::sync::Mutex;

    /// Generation double that records the last prompt and replays a fixed
    /// answer.
    #[derive(Debug)]
    struct ScriptedLlm {
        answer: Option<String>,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedLlm {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                last_prompt: Mutex::new(None),
            }
        }

        fn silent() -> Self {
            Self {
                answer: None,
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedLlm {
        async fn complete(&self, req: ChatRequest) -> anyhow::Result<Completion> {
            *self.last_prompt.lock().unwrap() =
                req.messages.last().and_then(|m| m.content.clone());
            Ok(Completion {
                content: self.answer.clone(),
                tool_calls: Vec::new(),
            })
        }
    }

    #[derive(Debug)]
    struct HashEmbedder;

    #[async_trait]
    impl Embedder for HashEmbedder {
        async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 8];
                    for (i, b) in t.bytes().enumerate() {
                        v[i % 8] += f32::from(b) / 255.0;
                    }
                    v
                })
                .collect())
        }
    }

    /// Embedder that always fails, for the query-embedding fallback path.
    #[derive(Debug)]
    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            Err(anyhow::anyhow!("embedding service unavailable"))
        }
    }

    fn index_store(root: &std::path::Path) -> Arc<VectorIndexStore> {
        Arc::new(VectorIndexStore::new(root, Arc::new(HashEmbedder)))
    }

    /// One document past the full-context cap.
    async fn seed_large_index(index: &VectorIndexStore, user_id: &str) {
        let mut handle = index.create(user_id, "doc 0").await.unwrap();
        for i in 1..=MAX_FULL_CONTEXT_DOCS {
            index.add(&mut handle, &format!("doc {i}")).await.unwrap();
        }
        index.save(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_budgeting_no_data_is_graceful() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = BudgetingStrategy::new(
            index_store(dir.path()),
            Arc::new(ScriptedLlm::answering("unused")),
        );

        let answer = strategy
            .answer(&QueryContext::new("nobody"), "how much did I spend?")
            .await;
        assert!(answer.contains("haven't logged any transactions"));
    }

    #[tokio::test]
    async fn test_budgeting_prompt_includes_history() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_store(dir.path());
        index.upsert("alice", "12 expense food tacos on 2025-01-01").await.unwrap();

        let llm = Arc::new(ScriptedLlm::answering("you spent 12 on tacos"));
        let strategy = BudgetingStrategy::new(index, Arc::clone(&llm) as Arc<dyn GenerationService>);

        let answer = strategy
            .answer(&QueryContext::new("alice"), "what did I buy?")
            .await;
        assert_eq!(answer, "you spent 12 on tacos");

        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("what did I buy?"));
        assert!(prompt.contains("12 expense food tacos on 2025-01-01"));
        assert!(prompt.contains("Use the above data"));
    }

    #[tokio::test]
    async fn test_empty_completion_gets_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_store(dir.path());
        index.upsert("alice", "doc").await.unwrap();

        let strategy = BudgetingStrategy::new(index, Arc::new(ScriptedLlm::silent()));
        let answer = strategy
            .answer(&QueryContext::new("alice"), "anything")
            .await;
        assert_eq!(answer, NO_RESPONSE_FALLBACK);
    }

    #[tokio::test]
    async fn test_large_index_prompts_with_top_k_only() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_store(dir.path());
        seed_large_index(&index, "alice").await;

        let llm = Arc::new(ScriptedLlm::answering("summarized"));
        let strategy = BudgetingStrategy::new(index, Arc::clone(&llm) as Arc<dyn GenerationService>);

        let answer = strategy.answer(&QueryContext::new("alice"), "doc 3").await;
        assert_eq!(answer, "summarized");

        // Question line + TOP_K context lines + instruction line.
        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.lines().count(), TOP_K + 2);
        // The document matching the question exactly must be retrieved.
        assert!(prompt.lines().any(|l| l == "doc 3"));
    }

    #[tokio::test]
    async fn test_query_embedding_failure_falls_back_to_full_history() {
        let dir = tempfile::tempdir().unwrap();
        seed_large_index(&index_store(dir.path()), "alice").await;

        // Same artifacts on disk, but query embedding now fails.
        let broken = Arc::new(VectorIndexStore::new(dir.path(), Arc::new(BrokenEmbedder)));
        let llm = Arc::new(ScriptedLlm::answering("summarized"));
        let strategy = BudgetingStrategy::new(broken, Arc::clone(&llm) as Arc<dyn GenerationService>);

        let answer = strategy
            .answer(&QueryContext::new("alice"), "anything")
            .await;
        assert_eq!(answer, "summarized");

        // Every stored document lands in the prompt.
        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.lines().count(), MAX_FULL_CONTEXT_DOCS + 3);
    }

    #[derive(Debug)]
    struct FailingLlm;

    #[async_trait]
    impl GenerationService for FailingLlm {
        async fn complete(&self, _req: ChatRequest) -> anyhow::Result<Completion> {
            Err(anyhow::anyhow!("upstream unavailable"))
        }
    }

    #[tokio::test]
    async fn test_education_error_becomes_text() {
        let strategy = EducationStrategy::new(Arc::new(FailingLlm));
        let answer = strategy
            .answer(&QueryContext::new("alice"), "what is an ETF?")
            .await;
        assert!(answer.starts_with("Error:"));
        assert!(answer.contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_education_passes_raw_question() {
        let llm = Arc::new(ScriptedLlm::answering("an ETF is a fund"));
        let strategy = EducationStrategy::new(Arc::clone(&llm) as Arc<dyn GenerationService>);

        let answer = strategy
            .answer(&QueryContext::new("alice"), "what is an ETF?")
            .await;
        assert_eq!(answer, "an ETF is a fund");

        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt, "what is an ETF?");
    }
}
