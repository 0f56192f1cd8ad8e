//! Author model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Full author model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub bio: Option<String>,
}

/// Create author request (also the body of a full PUT)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    pub bio: Option<String>,
}

/// Update author request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: Option<String>,
    /// Absent leaves the bio unchanged, `null` clears it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
}

impl From<CreateAuthor> for UpdateAuthor {
    fn from(data: CreateAuthor) -> Self {
        Self {
            name: Some(data.name),
            bio: data.bio.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_required() {
        let author: CreateAuthor = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(author.validate().is_err());

        assert!(serde_json::from_str::<CreateAuthor>(r#"{"bio": "x"}"#).is_err());
    }

    #[test]
    fn test_blank_name_is_rejected_after_trimming() {
        let author: CreateAuthor = serde_json::from_str(r#"{"name": "   "}"#).unwrap();
        assert_eq!(author.name, "");
        assert!(author.validate().is_err());

        let author: CreateAuthor = serde_json::from_str(r#"{"name": " Ann "}"#).unwrap();
        assert_eq!(author.name, "Ann");
        assert!(author.validate().is_ok());

        let update: UpdateAuthor = serde_json::from_str(r#"{"name": "\t"}"#).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_partial_update_allows_missing_name() {
        let update: UpdateAuthor = serde_json::from_str(r#"{"bio": "Poet"}"#).unwrap();
        assert!(update.validate().is_ok());
        assert!(update.name.is_none());
        assert_eq!(update.bio, Some(Some("Poet".to_string())));
    }

    #[test]
    fn test_null_bio_clears_and_absent_bio_keeps() {
        let update: UpdateAuthor = serde_json::from_str(r#"{"bio": null}"#).unwrap();
        assert_eq!(update.bio, Some(None));

        let update: UpdateAuthor = serde_json::from_str(r#"{"name": "Ann"}"#).unwrap();
        assert_eq!(update.bio, None);
    }
}
