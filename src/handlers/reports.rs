// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::visits::FilterQuery,
    middleware::i18n::Locale,
};

// GET /api/reports/visits.pdf
#[utoipa::path(
    get,
    path = "/api/reports/visits.pdf",
    tag = "Reports",
    params(FilterQuery),
    responses(
        (status = 200, description = "Relatório em PDF", body = String, content_type = "application/pdf"),
        (status = 422, description = "Mês inválido"),
        (status = 500, description = "Falha ao gerar o PDF")
    )
)]
pub async fn visits_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    let filter = query.into_filter().map_err(|e| e.to_api_error(&locale))?;

    let pdf_bytes = app_state
        .report_service
        .generate_visits_pdf(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let filename = match &filter.month {
        Some(month) => format!("visitas_{}.pdf", month),
        None => "visitas.pdf".to_string(),
    };

    // Configura os Headers para o navegador baixar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];

    Ok((headers, pdf_bytes).into_response())
}
