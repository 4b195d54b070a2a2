//! Per-user persistence: append-only transaction log and embedded vector
//! index.
//!
//! Layout on disk is one directory per user under the configured data root:
//!
//! ```text
//! <data_dir>/<user_id>/transactions.jsonl
//! <data_dir>/<user_id>/index.json
//! ```
//!
//! The two stores are written independently (log first, index second); the
//! index is always reconstructible from the log if the second write fails.

pub mod log;
pub mod transaction;
pub mod vector;

pub use transaction::Transaction;
