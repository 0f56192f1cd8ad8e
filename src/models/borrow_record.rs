//! Borrow record (lending ledger entry) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// One lending transaction, open while `return_date` is null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub book_id: i32,
    pub borrowed_by: String,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl BorrowRecord {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Borrow request body
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BorrowBook {
    pub book_id: Option<i32>,
    #[validate(length(max = 255, message = "Borrower name must be at most 255 characters"))]
    pub borrowed_by: Option<String>,
}

impl BorrowBook {
    /// Resolve required fields, rejecting missing or blank values
    pub fn into_parts(self) -> AppResult<(i32, String)> {
        let borrowed_by = self
            .borrowed_by
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        match (self.book_id, borrowed_by) {
            (Some(book_id), Some(borrowed_by)) => Ok((book_id, borrowed_by)),
            _ => Err(AppError::Validation(
                "Book ID and Borrower Name are required".to_string(),
            )),
        }
    }
}

/// Filters for listing borrow records
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowRecordQuery {
    /// Only records of this book
    pub book_id: Option<i32>,
    /// `true` for open records only, `false` for returned only
    pub active: Option<bool>,
}

impl BorrowRecordQuery {
    pub fn matches(&self, record: &BorrowRecord) -> bool {
        self.book_id.map_or(true, |id| record.book_id == id)
            && self.active.map_or(true, |active| record.is_open() == active)
    }
}
