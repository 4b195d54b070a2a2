//! Append-only per-user transaction log.
//!
//! One JSON object per line, appended in submission order and never
//! rewritten. Lines are validated on read; the log is never interpreted as
//! anything but data.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::store::Transaction;

/// File name of the per-user log inside the user's data directory.
const LOG_FILE: &str = "transactions.jsonl";

/// Append-only JSON Lines log, one file per user.
#[derive(Debug)]
pub struct TransactionLog {
    root: PathBuf,
}

impl TransactionLog {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn log_path(&self, user_id: &str) -> PathBuf {
        self.root.join(user_id).join(LOG_FILE)
    }

    /// Serialize the transaction to one line and append it, creating the
    /// user's directory and log file on first use.
    pub async fn append(&self, user_id: &str, txn: &Transaction) -> Result<(), StoreError> {
        let path = self.log_path(user_id);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut line = serde_json::to_vec(txn).map_err(StoreError::Encode)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(
            user_id = %user_id,
            path = %path.display(),
            "Transaction appended to log"
        );
        Ok(())
    }

    /// All transactions for the user in file (= submission) order.
    ///
    /// A user with no log yet gets an empty vec, not an error. A line that
    /// fails to parse is a [`StoreError::Corrupt`] for the whole read.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Transaction>, StoreError> {
        let path = self.log_path(user_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        parse_log(&raw, &path)
    }
}

fn parse_log(raw: &str, path: &Path) -> Result<Vec<Transaction>, StoreError> {
    let mut transactions = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let txn = serde_json::from_str(line).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            line: idx + 1,
            source,
        })?;
        transactions.push(txn);
    }
    Ok(transactions)
}
