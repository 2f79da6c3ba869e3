// src/handlers/uploads.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::upload::{PendingUploadView, ReplaceOutcome, UploadOutcome},
    services::import::parse_workbook,
};

// Nome do campo multipart com a planilha
const FILE_FIELD: &str = "file";

// Só para documentação do corpo multipart no Swagger
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct UploadForm {
    /// Planilha .xlsx, .xls ou .ods
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

async fn read_file_field(mut multipart: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.body_text()))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Upload(e.body_text()))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::Upload(format!("campo '{}' ausente", FILE_FIELD)))
}

// POST /api/uploads
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "Uploads",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Lote inserido sem colisões", body = UploadOutcome),
        (status = 202, description = "Colisão detectada, aguardando confirmação", body = UploadOutcome),
        (status = 422, description = "Planilha inválida")
    )
)]
pub async fn upload_spreadsheet(
    State(app_state): State<AppState>,
    locale: Locale,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_file_field(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tracing::info!("📄 Planilha recebida ({} bytes)", bytes.len());

    // calamine é síncrono: parse fora do executor
    let drafts = tokio::task::spawn_blocking(move || parse_workbook(bytes))
        .await
        .map_err(|e| AppError::from(anyhow::anyhow!("Falha na task de importação: {}", e)))
        .and_then(|parsed| parsed.map_err(AppError::from))
        .map_err(|e| e.to_api_error(&locale))?;

    let outcome = app_state
        .upload_controller
        .submit(drafts)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let status = match outcome {
        UploadOutcome::Inserted { .. } => StatusCode::CREATED,
        UploadOutcome::OverlapDetected { .. } => StatusCode::ACCEPTED,
    };

    Ok((status, Json(outcome)))
}

// GET /api/uploads/{id}
#[utoipa::path(
    get,
    path = "/api/uploads/{id}",
    tag = "Uploads",
    params(("id" = Uuid, Path, description = "ID do upload pendente")),
    responses(
        (status = 200, description = "Upload pendente", body = PendingUploadView),
        (status = 404, description = "Upload pendente não encontrado ou expirado")
    )
)]
pub async fn get_pending_upload(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .upload_controller
        .pending(id)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(view)))
}

// POST /api/uploads/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/uploads/{id}/confirm",
    tag = "Uploads",
    params(("id" = Uuid, Path, description = "ID do upload pendente")),
    responses(
        (status = 200, description = "Dados substituídos", body = ReplaceOutcome),
        (status = 404, description = "Upload pendente não encontrado"),
        (status = 409, description = "Upload em estado que não permite confirmar"),
        (status = 502, description = "Substituição incompleta ou falha no armazenamento")
    )
)]
pub async fn confirm_upload(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .upload_controller
        .confirm(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(outcome)))
}

// DELETE /api/uploads/{id}
#[utoipa::path(
    delete,
    path = "/api/uploads/{id}",
    tag = "Uploads",
    params(("id" = Uuid, Path, description = "ID do upload pendente")),
    responses(
        (status = 204, description = "Upload descartado"),
        (status = 404, description = "Upload pendente não encontrado")
    )
)]
pub async fn cancel_upload(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .upload_controller
        .cancel(id)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
