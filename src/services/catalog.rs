//! Catalog management service (authors and books)

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, CreateBook, UpdateBook},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, data: &CreateAuthor) -> AppResult<Author> {
        let author = self.repository.authors.create(data).await?;
        tracing::info!(author_id = author.id, "Author created");
        Ok(author)
    }

    /// Full update: every required field is supplied
    pub async fn replace_author(&self, id: i32, data: CreateAuthor) -> AppResult<Author> {
        self.repository.authors.update(id, &data.into()).await
    }

    pub async fn update_author(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        self.repository.authors.update(id, data).await
    }

    /// Delete an author, its books and their borrow records
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        let book = self.repository.books.create(data).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, "Book created");
        Ok(book)
    }

    /// Full update: every required field is supplied
    pub async fn replace_book(&self, id: i32, data: CreateBook) -> AppResult<Book> {
        self.repository.books.update(id, &data.into()).await
    }

    pub async fn update_book(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, data).await
    }

    /// Delete a book and its borrow records
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// Cheap round trip to the store, used by the readiness check
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.authors.count().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::eq;

    use super::*;
    use crate::repository::{MockAuthorRepo, MockBookRepo, MockLedgerRepo};

    fn service(authors: MockAuthorRepo, books: MockBookRepo) -> CatalogService {
        CatalogService::new(Repository {
            authors: Arc::new(authors),
            books: Arc::new(books),
            ledger: Arc::new(MockLedgerRepo::new()),
        })
    }

    #[tokio::test]
    async fn test_replace_book_sends_every_field() {
        let mut books = MockBookRepo::new();
        books
            .expect_update()
            .with(
                eq(7),
                mockall::predicate::function(|u: &UpdateBook| {
                    u.title.as_deref() == Some("Dune")
                        && u.author_id == Some(2)
                        && u.isbn.as_deref() == Some("9780441172719")
                        && u.available_copies == Some(0)
                }),
            )
            .times(1)
            .returning(|id, _| {
                Ok(Book {
                    id,
                    title: "Dune".into(),
                    author_id: 2,
                    isbn: "9780441172719".into(),
                    available_copies: 0,
                })
            });

        let catalog = service(MockAuthorRepo::new(), books);
        let book = catalog
            .replace_book(
                7,
                CreateBook {
                    title: "Dune".into(),
                    author_id: 2,
                    isbn: "9780441172719".into(),
                    available_copies: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(book.id, 7);
    }

    #[tokio::test]
    async fn test_delete_author_is_forwarded() {
        let mut authors = MockAuthorRepo::new();
        authors.expect_delete().with(eq(3)).times(1).returning(|_| Ok(()));

        let catalog = service(authors, MockBookRepo::new());
        catalog.delete_author(3).await.unwrap();
    }
}
