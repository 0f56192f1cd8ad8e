//! Report endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::report::ReportSnapshot};

#[derive(Serialize, ToSchema)]
pub struct ReportAccepted {
    pub message: String,
}

/// Queue a report generation
#[utoipa::path(
    post,
    path = "/reports",
    tag = "reports",
    responses(
        (status = 202, description = "Report generation started", body = ReportAccepted)
    )
)]
pub async fn generate_report(
    State(state): State<crate::AppState>,
) -> AppResult<(StatusCode, Json<ReportAccepted>)> {
    state.services.reports.request_generation()?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ReportAccepted {
            message: "Report generation started".to_string(),
        }),
    ))
}

/// Fetch the most recent report
#[utoipa::path(
    get,
    path = "/reports/latest",
    tag = "reports",
    responses(
        (status = 200, description = "Latest report", body = ReportSnapshot),
        (status = 404, description = "No reports available", body = crate::error::ErrorResponse),
        (status = 500, description = "Report could not be read", body = crate::error::ErrorResponse)
    )
)]
pub async fn latest_report(State(state): State<crate::AppState>) -> AppResult<Json<ReportSnapshot>> {
    let report = state.services.reports.latest().await?;
    Ok(Json(report))
}
