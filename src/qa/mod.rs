//! Question answering: classifier, answering strategies and the router
//! that dispatches between them.

pub mod classifier;
pub mod router;
pub mod strategy;

/// Per-request context passed explicitly into strategies and agent tools.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Stable identifier of the authenticated user.
    pub user_id: String,
}

impl QueryContext {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
