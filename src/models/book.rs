//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub isbn: String,
    /// Copies not currently lent out (never negative)
    pub available_copies: i32,
}

/// Create book request (also the body of a full PUT)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    pub author_id: i32,
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1 to 13 characters"))]
    pub isbn: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "available_copies cannot be negative"))]
    pub available_copies: i32,
}

/// Update book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1 to 13 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "available_copies cannot be negative"))]
    pub available_copies: Option<i32>,
}

impl From<CreateBook> for UpdateBook {
    fn from(data: CreateBook) -> Self {
        Self {
            title: Some(data.title),
            author_id: Some(data.author_id),
            isbn: Some(data.isbn),
            available_copies: Some(data.available_copies),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_default_to_zero() {
        let book: CreateBook =
            serde_json::from_str(r#"{"title": "Dune", "author_id": 1, "isbn": "9780441172719"}"#)
                .unwrap();
        assert_eq!(book.available_copies, 0);
        assert!(book.validate().is_ok());
    }

    #[test]
    fn test_blank_title_and_isbn_are_rejected() {
        let book: CreateBook =
            serde_json::from_str(r#"{"title": "  ", "author_id": 1, "isbn": " "}"#).unwrap();
        let errors = book.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("isbn"));

        let update: UpdateBook = serde_json::from_str(r#"{"isbn": " 9780441172719 "}"#).unwrap();
        assert_eq!(update.isbn.as_deref(), Some("9780441172719"));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_copies_and_long_isbn() {
        let book = CreateBook {
            title: "Dune".into(),
            author_id: 1,
            isbn: "97804411727190".into(),
            available_copies: -1,
        };
        let errors = book.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("isbn"));
        assert!(fields.contains_key("available_copies"));
    }
}
