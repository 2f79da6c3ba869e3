// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::visits::FilterQuery,
    middleware::i18n::Locale,
    models::dashboard::DashboardView,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    params(FilterQuery),
    responses(
        (status = 200, description = "KPIs da visão filtrada e meses com histórico", body = DashboardView),
        (status = 422, description = "Mês inválido"),
        (status = 504, description = "Armazenamento não respondeu a tempo")
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter().map_err(|e| e.to_api_error(&locale))?;

    let view = app_state
        .dashboard_service
        .load(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(view)))
}
