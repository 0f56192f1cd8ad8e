//! Lending ledger endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow_record::{BorrowBook, BorrowRecord, BorrowRecordQuery},
};

use super::{ApiPath, ApiQuery, ValidatedJson};

/// Borrow / return response
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    /// Status message
    pub message: String,
    /// The ledger entry after the operation
    pub borrow_record: BorrowRecord,
}

/// List borrow records
#[utoipa::path(
    get,
    path = "/borrow",
    tag = "borrow",
    params(BorrowRecordQuery),
    responses(
        (status = 200, description = "Borrow records", body = Vec<BorrowRecord>)
    )
)]
pub async fn list_records(
    State(state): State<crate::AppState>,
    ApiQuery(query): ApiQuery<BorrowRecordQuery>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.lending.list(&query).await?;
    Ok(Json(records))
}

/// Get a borrow record
#[utoipa::path(
    get,
    path = "/borrow/{id}",
    tag = "borrow",
    params(("id" = i32, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Borrow record", body = BorrowRecord),
        (status = 404, description = "Borrow record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_record(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<BorrowRecord>> {
    let record = state.services.lending.get(id).await?;
    Ok(Json(record))
}

/// Borrow one copy of a book
#[utoipa::path(
    post,
    path = "/borrow/borrow-book",
    tag = "borrow",
    request_body = BorrowBook,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "Missing fields or no copies available", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<BorrowBook>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let record = state.services.lending.borrow_book(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: "Book borrowed successfully".to_string(),
            borrow_record: record,
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/borrow/{id}/return-book",
    tag = "borrow",
    params(("id" = i32, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Book returned", body = BorrowResponse),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<BorrowResponse>> {
    let record = state.services.lending.return_book(id).await?;

    Ok(Json(BorrowResponse {
        message: "Book returned successfully".to_string(),
        borrow_record: record,
    }))
}
