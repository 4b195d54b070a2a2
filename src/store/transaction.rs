use serde::{Deserialize, Serialize};

/// A single logged transaction. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    pub transaction_type: String,
    pub category: String,
    pub description: String,
    /// Timestamp string as submitted by the client (e.g. RFC 3339).
    /// Stored verbatim, never reinterpreted.
    pub date: String,
}

impl Transaction {
    /// Textual rendering used as the embedded document for this transaction.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{} {} {} {} on {}",
            self.amount, self.transaction_type, self.category, self.description, self.date
        )
    }
}
