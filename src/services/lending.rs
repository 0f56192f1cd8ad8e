//! Lending ledger service (borrow and return)

use crate::{
    error::AppResult,
    models::borrow_record::{BorrowBook, BorrowRecord, BorrowRecordQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &BorrowRecordQuery) -> AppResult<Vec<BorrowRecord>> {
        self.repository.ledger.list(query).await
    }

    pub async fn get(&self, id: i32) -> AppResult<BorrowRecord> {
        self.repository.ledger.get_by_id(id).await
    }

    /// Lend one copy of a book.
    ///
    /// The record is created and the book's available copies decremented in
    /// one unit of work; a book with no copies left is rejected untouched.
    pub async fn borrow_book(&self, request: BorrowBook) -> AppResult<BorrowRecord> {
        let (book_id, borrowed_by) = request.into_parts()?;

        let record = self.repository.ledger.borrow(book_id, &borrowed_by).await?;

        tracing::info!(
            record_id = record.id,
            book_id,
            borrowed_by = %record.borrowed_by,
            "Book borrowed"
        );
        Ok(record)
    }

    /// Close a borrow record and put its copy back
    pub async fn return_book(&self, record_id: i32) -> AppResult<BorrowRecord> {
        let record = self.repository.ledger.return_record(record_id).await?;

        tracing::info!(record_id, book_id = record.book_id, "Book returned");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        error::AppError,
        repository::{MockAuthorRepo, MockBookRepo, MockLedgerRepo},
    };

    fn service(ledger: MockLedgerRepo) -> LendingService {
        LendingService::new(Repository {
            authors: Arc::new(MockAuthorRepo::new()),
            books: Arc::new(MockBookRepo::new()),
            ledger: Arc::new(ledger),
        })
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_ledger() {
        // No expectations: any ledger call would panic
        let lending = service(MockLedgerRepo::new());

        let err = lending
            .borrow_book(BorrowBook {
                book_id: Some(1),
                borrowed_by: Some("".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_borrow_passes_trimmed_name() {
        let mut ledger = MockLedgerRepo::new();
        ledger
            .expect_borrow()
            .with(eq(5), mockall::predicate::function(|name: &str| name == "Alice"))
            .times(1)
            .returning(|book_id, name| {
                Ok(BorrowRecord {
                    id: 1,
                    book_id,
                    borrowed_by: name.to_string(),
                    borrow_date: Utc::now(),
                    return_date: None,
                })
            });

        let record = service(ledger)
            .borrow_book(BorrowBook {
                book_id: Some(5),
                borrowed_by: Some(" Alice ".into()),
            })
            .await
            .unwrap();
        assert!(record.is_open());
        assert_eq!(record.borrowed_by, "Alice");
    }

    #[tokio::test]
    async fn test_return_errors_propagate() {
        let mut ledger = MockLedgerRepo::new();
        ledger
            .expect_return_record()
            .with(eq(9))
            .returning(|_| Err(AppError::AlreadyReturned("Book already returned".into())));

        let err = service(ledger).return_book(9).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReturned(_)));
    }
}
