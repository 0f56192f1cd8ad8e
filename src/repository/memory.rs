//! In-process store implementing every repository trait
//!
//! All three tables sit behind one lock, so each trait call is a single
//! isolated unit of work, matching the transactional Postgres backend.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{AuthorRepo, BookRepo, LedgerRepo};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, CreateBook, UpdateBook},
        borrow_record::{BorrowRecord, BorrowRecordQuery},
        report::LibraryTotals,
    },
};

#[derive(Default)]
struct Tables {
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    records: BTreeMap<i32, BorrowRecord>,
    next_author_id: i32,
    next_book_id: i32,
    next_record_id: i32,
}

impl Tables {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }

    fn check_author(&self, author_id: i32) -> AppResult<()> {
        if !self.authors.contains_key(&author_id) {
            return Err(AppError::Validation(format!(
                "Author {} does not exist",
                author_id
            )));
        }
        Ok(())
    }

    fn check_isbn_free(&self, isbn: &str, except: Option<i32>) -> AppResult<()> {
        let taken = self
            .books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != except);
        if taken {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                isbn
            )));
        }
        Ok(())
    }

    /// Remove a book and its records, returning how many records went with it
    fn remove_book(&mut self, book_id: i32) -> usize {
        self.books.remove(&book_id);
        let before = self.records.len();
        self.records.retain(|_, r| r.book_id != book_id);
        before - self.records.len()
    }
}

/// Cloneable handle to a shared in-process store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorRepo for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Author>> {
        Ok(self.tables.read().await.authors.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        self.tables
            .read()
            .await
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    async fn create(&self, data: &CreateAuthor) -> AppResult<Author> {
        let mut tables = self.tables.write().await;
        let id = Tables::next_id(&mut tables.next_author_id);
        let author = Author {
            id,
            name: data.name.clone(),
            bio: data.bio.clone(),
        };
        tables.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        let mut tables = self.tables.write().await;
        let author = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))?;

        if let Some(ref name) = data.name {
            author.name = name.clone();
        }
        if let Some(ref bio) = data.bio {
            author.bio = bio.clone();
        }
        Ok(author.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.authors.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Author {} not found", id)));
        }

        let book_ids: Vec<i32> = tables
            .books
            .values()
            .filter(|b| b.author_id == id)
            .map(|b| b.id)
            .collect();
        let records: usize = book_ids.iter().map(|&b| tables.remove_book(b)).sum();

        tracing::info!(author_id = id, books = book_ids.len(), records, "Deleted author with dependants");
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.read().await.authors.len() as i64)
    }
}

#[async_trait]
impl BookRepo for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.tables
            .read()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        tables.check_author(data.author_id)?;
        tables.check_isbn_free(&data.isbn, None)?;

        let id = Tables::next_id(&mut tables.next_book_id);
        let book = Book {
            id,
            title: data.title.clone(),
            author_id: data.author_id,
            isbn: data.isbn.clone(),
            available_copies: data.available_copies,
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        if let Some(author_id) = data.author_id {
            tables.check_author(author_id)?;
        }
        if let Some(ref isbn) = data.isbn {
            tables.check_isbn_free(isbn, Some(id))?;
        }

        let book = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
        if let Some(ref title) = data.title {
            book.title = title.clone();
        }
        if let Some(author_id) = data.author_id {
            book.author_id = author_id;
        }
        if let Some(ref isbn) = data.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(copies) = data.available_copies {
            book.available_copies = copies;
        }
        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        let records = tables.remove_book(id);
        tracing::info!(book_id = id, records, "Deleted book with borrow records");
        Ok(())
    }
}

#[async_trait]
impl LedgerRepo for MemoryStore {
    async fn list(&self, query: &BorrowRecordQuery) -> AppResult<Vec<BorrowRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<BorrowRecord> {
        self.tables
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrow record {} not found", id)))
    }

    async fn borrow(&self, book_id: i32, borrowed_by: &str) -> AppResult<BorrowRecord> {
        let mut tables = self.tables.write().await;
        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        if book.available_copies <= 0 {
            return Err(AppError::NoCopiesAvailable("No available copies".to_string()));
        }
        book.available_copies -= 1;

        let id = Tables::next_id(&mut tables.next_record_id);
        let record = BorrowRecord {
            id,
            book_id,
            borrowed_by: borrowed_by.to_string(),
            borrow_date: Utc::now(),
            return_date: None,
        };
        tables.records.insert(id, record.clone());
        Ok(record)
    }

    async fn return_record(&self, id: i32) -> AppResult<BorrowRecord> {
        let mut tables = self.tables.write().await;
        let record = tables
            .records
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow record {} not found", id)))?;

        if record.return_date.is_some() {
            return Err(AppError::AlreadyReturned("Book already returned".to_string()));
        }
        let book_id = record.book_id;

        let book = tables.books.get_mut(&book_id).ok_or_else(|| {
            AppError::Internal(format!("Borrow record {} points at missing book {}", id, book_id))
        })?;
        book.available_copies += 1;

        let record = tables
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow record {} not found", id)))?;
        record.return_date = Some(Utc::now());
        Ok(record.clone())
    }

    async fn totals(&self) -> AppResult<LibraryTotals> {
        let tables = self.tables.read().await;
        Ok(LibraryTotals {
            authors: tables.authors.len() as i64,
            books: tables.books.len() as i64,
            open_records: tables.records.values().filter(|r| r.is_open()).count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(store: &MemoryStore, copies: i32) -> Book {
        let author = AuthorRepo::create(
            store,
            &CreateAuthor {
                name: "John Doe".into(),
                bio: Some("Test Author Bio".into()),
            },
        )
        .await
        .unwrap();

        BookRepo::create(
            store,
            &CreateBook {
                title: "Sample Book".into(),
                author_id: author.id,
                isbn: "1234567890123".into(),
                available_copies: copies,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_isbn_is_conflict() {
        let store = MemoryStore::new();
        let book = seed(&store, 1).await;

        let err = BookRepo::create(
            &store,
            &CreateBook {
                title: "Other".into(),
                author_id: book.author_id,
                isbn: book.isbn.clone(),
                available_copies: 0,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_book_requires_existing_author() {
        let store = MemoryStore::new();
        let err = BookRepo::create(
            &store,
            &CreateBook {
                title: "Orphan".into(),
                author_id: 42,
                isbn: "1".into(),
                available_copies: 0,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_borrow_with_no_copies_leaves_state_unchanged() {
        let store = MemoryStore::new();
        let book = seed(&store, 0).await;

        let err = store.borrow(book.id, "Alice").await.unwrap_err();
        assert!(matches!(err, AppError::NoCopiesAvailable(_)));
        assert_eq!(BookRepo::get_by_id(&store, book.id).await.unwrap().available_copies, 0);
        assert_eq!(store.totals().await.unwrap().open_records, 0);
    }

    #[tokio::test]
    async fn test_return_twice_is_rejected() {
        let store = MemoryStore::new();
        let book = seed(&store, 1).await;

        let record = store.borrow(book.id, "Alice").await.unwrap();
        let returned = store.return_record(record.id).await.unwrap();
        let first_return = returned.return_date;
        assert!(first_return.is_some());

        let err = store.return_record(record.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReturned(_)));
        assert_eq!(LedgerRepo::get_by_id(&store, record.id).await.unwrap().return_date, first_return);
        assert_eq!(BookRepo::get_by_id(&store, book.id).await.unwrap().available_copies, 1);
    }

    #[tokio::test]
    async fn test_deleting_author_cascades() {
        let store = MemoryStore::new();
        let book = seed(&store, 2).await;
        store.borrow(book.id, "Alice").await.unwrap();

        AuthorRepo::delete(&store, book.author_id).await.unwrap();

        let totals = store.totals().await.unwrap();
        assert_eq!(totals.authors, 0);
        assert_eq!(totals.books, 0);
        assert_eq!(totals.open_records, 0);
        assert!(LedgerRepo::list(&store, &BorrowRecordQuery::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_isbn_may_be_kept_on_update() {
        let store = MemoryStore::new();
        let book = seed(&store, 2).await;

        let updated = BookRepo::update(
            &store,
            book.id,
            &UpdateBook {
                title: Some("Renamed".into()),
                isbn: Some(book.isbn.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.isbn, book.isbn);
    }
}
