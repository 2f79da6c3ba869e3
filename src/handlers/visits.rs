// src/handlers/visits.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{upload::DuplicationOutcome, Visit, VisitDraft, VisitFilter, VisitPatch, YearMonth},
};

// ---
// Query: filtros compartilhados por listagem, dashboard e relatório
// ---
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// Mês no formato YYYY-MM
    #[param(example = "2024-08")]
    pub month: Option<String>,
    pub executive: Option<String>,
    pub agent: Option<String>,
}

// Campo vazio na query ("?executive=") vale como filtro ausente
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FilterQuery {
    pub fn into_filter(self) -> Result<VisitFilter, AppError> {
        let month = non_empty(self.month)
            .map(|raw| parse_month(&raw))
            .transpose()?;
        Ok(VisitFilter {
            month,
            executive: non_empty(self.executive),
            agent: non_empty(self.agent),
        })
    }
}

fn parse_month(raw: &str) -> Result<YearMonth, AppError> {
    raw.parse::<YearMonth>()
        .map_err(|_| AppError::InvalidMonth(raw.to_string()))
}

// ---
// Payload: DuplicateMonth
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMonthPayload {
    #[schema(example = "2024-08")]
    pub source_month: String,
    #[schema(example = "2024-09")]
    pub target_month: String,
}

// GET /api/visits
#[utoipa::path(
    get,
    path = "/api/visits",
    tag = "Visits",
    params(FilterQuery),
    responses(
        (status = 200, description = "Visitas filtradas", body = Vec<Visit>),
        (status = 422, description = "Mês inválido"),
        (status = 502, description = "Falha no armazenamento")
    )
)]
pub async fn list_visits(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter().map_err(|e| e.to_api_error(&locale))?;

    let visits = app_state
        .visit_service
        .list(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(visits)))
}

// POST /api/visits
#[utoipa::path(
    post,
    path = "/api/visits",
    tag = "Visits",
    request_body = VisitDraft,
    responses(
        (status = 201, description = "Visita criada", body = Visit),
        (status = 422, description = "Dados inválidos")
    )
)]
pub async fn create_visit(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<VisitDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let visit = app_state
        .visit_service
        .create(payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(visit)))
}

// PATCH /api/visits/{id}
#[utoipa::path(
    patch,
    path = "/api/visits/{id}",
    tag = "Visits",
    request_body = VisitPatch,
    params(("id" = Uuid, Path, description = "ID da visita")),
    responses(
        (status = 204, description = "Visita atualizada"),
        (status = 404, description = "Visita não encontrada"),
        (status = 422, description = "Dados inválidos")
    )
)]
pub async fn update_visit(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisitPatch>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .visit_service
        .update(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/visits/{id}
#[utoipa::path(
    delete,
    path = "/api/visits/{id}",
    tag = "Visits",
    params(("id" = Uuid, Path, description = "ID da visita")),
    responses(
        (status = 204, description = "Visita removida"),
        (status = 404, description = "Visita não encontrada")
    )
)]
pub async fn delete_visit(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .visit_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/visits
#[utoipa::path(
    delete,
    path = "/api/visits",
    tag = "Visits",
    responses(
        (status = 204, description = "Todas as visitas removidas"),
        (status = 502, description = "Falha no armazenamento")
    )
)]
pub async fn delete_all_visits(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .visit_service
        .delete_all()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/visits/duplicate
#[utoipa::path(
    post,
    path = "/api/visits/duplicate",
    tag = "Visits",
    request_body = DuplicateMonthPayload,
    responses(
        (status = 201, description = "Mês duplicado", body = DuplicationOutcome),
        (status = 404, description = "Mês de origem sem visitas"),
        (status = 422, description = "Mês inválido ou origem igual ao destino")
    )
)]
pub async fn duplicate_month(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<DuplicateMonthPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let source = parse_month(payload.source_month.trim()).map_err(|e| e.to_api_error(&locale))?;
    let target = parse_month(payload.target_month.trim()).map_err(|e| e.to_api_error(&locale))?;

    let outcome = app_state
        .duplication_service
        .duplicate_month(source, target)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(outcome)))
}
