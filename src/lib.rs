//! Budgetmind
//!
//! A personal finance assistant backend. Users log transactions and ask
//! natural-language questions; each question is answered either from the
//! user's own transaction history (retrieval-augmented "budgeting") or from
//! general knowledge ("education"), selected by a classifier or by an
//! agentic tool loop.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP API with JWT identity
//! - **Store**: per-user append-only transaction log + embedded vector index
//! - **QA**: question classifier, router and answering strategies
//! - **Agent**: bounded tool loop over the strategies with per-run memory
//!
//! # Modules
//!
//! - [`store`]: transaction log and vector index persistence
//! - [`qa`]: classifier, router and answering strategies
//! - [`agent`]: agentic query path
//! - [`llm`]: generation service client
//! - [`embedding`]: text embedding service

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod agent;
pub mod api;
pub mod auth;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod qa;
pub mod server;
pub mod store;

use crate::agent::AgentRunner;
use crate::config::AppConfig;
use crate::qa::router::QuestionRouter;
use crate::store::log::TransactionLog;
use crate::store::vector::VectorIndexStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Append-only per-user transaction log.
    pub log: Arc<TransactionLog>,
    /// Per-user embedded vector index store.
    pub index: Arc<VectorIndexStore>,
    /// Classifier-driven question router.
    pub router: Arc<QuestionRouter>,
    /// Agentic query runner.
    pub agent: Arc<AgentRunner>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish()
    }
}
