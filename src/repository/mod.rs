//! Repository layer for catalog and ledger storage
//!
//! Each table is reached through a trait so that services do not care whether
//! rows live in Postgres or in the in-process store. Operations that touch two
//! records (borrow, return, cascading deletes) are single trait calls and run
//! as one unit of work inside the backend.

pub mod memory;
pub mod postgres;
pub mod snapshots;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, CreateBook, UpdateBook},
        borrow_record::{BorrowRecord, BorrowRecordQuery},
        report::LibraryTotals,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorRepo: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Author>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Author>;
    async fn create(&self, data: &CreateAuthor) -> AppResult<Author>;
    async fn update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author>;
    /// Delete an author together with its books and their borrow records
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn count(&self) -> AppResult<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepo: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn create(&self, data: &CreateBook) -> AppResult<Book>;
    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book>;
    /// Delete a book together with its borrow records
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepo: Send + Sync {
    async fn list(&self, query: &BorrowRecordQuery) -> AppResult<Vec<BorrowRecord>>;
    async fn get_by_id(&self, id: i32) -> AppResult<BorrowRecord>;
    /// Open a record and take one copy off the book, atomically
    async fn borrow(&self, book_id: i32, borrowed_by: &str) -> AppResult<BorrowRecord>;
    /// Close a record and put its copy back on the book, atomically
    async fn return_record(&self, id: i32) -> AppResult<BorrowRecord>;
    /// Author, book and open-record counts taken from one consistent view
    async fn totals(&self) -> AppResult<LibraryTotals>;
}

/// Main repository struct holding one handle per table
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorRepo>,
    pub books: Arc<dyn BookRepo>,
    pub ledger: Arc<dyn LedgerRepo>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(postgres::PgAuthorRepo::new(pool.clone())),
            books: Arc::new(postgres::PgBookRepo::new(pool.clone())),
            ledger: Arc::new(postgres::PgLedgerRepo::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-process store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            authors: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            ledger: Arc::new(store),
        }
    }
}
