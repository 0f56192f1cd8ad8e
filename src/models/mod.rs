//! Data models for Libris

pub mod author;
pub mod book;
pub mod borrow_record;
pub mod report;

use serde::{Deserialize, Deserializer};

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use borrow_record::BorrowRecord;
pub use report::ReportSnapshot;

/// Deserialize a string with surrounding whitespace removed, so that
/// `length(min = 1)` rules reject blank values
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

pub(crate) fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}
