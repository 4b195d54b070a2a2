//! Server assembly: state construction, router, middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::agent::AgentRunner;
use crate::agent::tools::{AgentTool, BudgetingTool, EducationTool};
use crate::auth;
use crate::config::AppConfig;
use crate::embedding::{Embedder, FastEmbedder};
use crate::llm::{ChatCompletionsClient, GenerationService, LlmSettings};
use crate::qa::classifier::QuestionClassifier;
use crate::qa::router::QuestionRouter;
use crate::qa::strategy::{AnswerStrategy, BudgetingStrategy, EducationStrategy};
use crate::store::log::TransactionLog;
use crate::store::vector::VectorIndexStore;

impl AppState {
    /// Wire stores, strategies, router and agent from the given services.
    ///
    /// The embedder and generation service come in through their trait
    /// seams so tests can substitute doubles.
    #[must_use]
    pub fn build(
        config: Arc<AppConfig>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn GenerationService>,
    ) -> Self {
        let data_dir = config.storage.data_dir.clone();
        let log = Arc::new(TransactionLog::new(&data_dir));
        let index = Arc::new(VectorIndexStore::new(&data_dir, embedder));

        let budgeting: Arc<dyn AnswerStrategy> =
            Arc::new(BudgetingStrategy::new(Arc::clone(&index), Arc::clone(&llm)));
        let education: Arc<dyn AnswerStrategy> =
            Arc::new(EducationStrategy::new(Arc::clone(&llm)));

        let router = Arc::new(QuestionRouter::new(
            QuestionClassifier::new(Arc::clone(&llm)),
            Arc::clone(&budgeting),
            Arc::clone(&education),
        ));

        let tools: Vec<Arc<dyn AgentTool>> = vec![
            Arc::new(BudgetingTool::new(budgeting)),
            Arc::new(EducationTool::new(education)),
        ];
        let agent = Arc::new(AgentRunner::new(llm, tools));

        Self {
            log,
            index,
            router,
            agent,
            config,
        }
    }
}

/// Build the application router with the full middleware stack.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = if state.config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60) // effectively off
    } else {
        Duration::from_secs(60)
    };

    // Identity applies to /api only; liveness stays reachable without a token.
    let api = Router::new()
        .route(
            "/api/transactions",
            post(crate::api::transactions::create_transaction)
                .get(crate::api::transactions::list_transactions),
        )
        .route("/api/query", post(crate::api::query::direct_query))
        .route("/api/agent/query", post(crate::api::query::agentic_query))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                let duration = timeout_duration;
                async move {
                    match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    }
                }
            },
        ))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Start the server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        "LLM configuration loaded"
    );

    let embedder = Arc::new(FastEmbedder::new());
    embedder.initialize().await?;

    let llm = Arc::new(ChatCompletionsClient::new(settings)?);
    let state = AppState::build(Arc::clone(&config), embedder, llm);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        data_dir = %config.storage.data_dir,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
