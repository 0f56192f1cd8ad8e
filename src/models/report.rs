//! Report snapshot model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Catalog and ledger sizes read at a single point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct LibraryTotals {
    pub authors: i64,
    pub books: i64,
    /// Borrow records whose `return_date` is null
    pub open_records: i64,
}

/// Point-in-time aggregate counts, persisted as one JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportSnapshot {
    pub total_authors: i64,
    pub total_books: i64,
    /// Borrow records whose `return_date` is null
    pub total_borrowed_books: i64,
    /// Wall-clock generation time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}
