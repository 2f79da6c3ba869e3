// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    middleware::i18n::Locale,
    models::{month::YearMonth, upload::UploadState},
    services::import::ImportError,
};

// Nosso tipo de erro. A mensagem do `thiserror` vai para o log;
// a mensagem para o usuário sai de `localized()`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Erro na importação: {0}")]
    Import(#[from] ImportError),

    #[error("Mês inválido: {0}")]
    InvalidMonth(String),

    #[error("Mês de origem e destino são iguais ({0})")]
    SameMonthDuplication(YearMonth),

    #[error("Nenhuma visita no mês de origem {0}")]
    NoSourceData(YearMonth),

    #[error("Lote vazio")]
    EmptyUpload,

    #[error("Upload inválido: {0}")]
    Upload(String),

    #[error("Visita {0} não encontrada")]
    VisitNotFound(Uuid),

    #[error("Upload pendente {0} não encontrado")]
    PendingUploadNotFound(Uuid),

    #[error("Transição de estado inválida: {from} -> {to}")]
    InvalidUploadState { from: UploadState, to: UploadState },

    // Exclusão feita, inserção falhou: os dados dos pares afetados podem ter sumido.
    #[error("Substituição incompleta ({deleted} removidas, restantes: {remaining:?}): {message}")]
    ReplaceIncomplete {
        deleted: u64,
        remaining: Option<usize>,
        message: String,
    },

    // Erros do backend de armazenamento (rede, permissão, tabela ausente...)
    #[error("Erro no armazenamento: {0}")]
    Store(String),

    #[error("O armazenamento não respondeu em {0}s")]
    StoreTimeout(u64),

    #[error("Erro ao gerar relatório: {0}")]
    Report(String),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Tipo de erro legível por máquina, enviado ao front junto da mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Import,
    InvalidMonth,
    SameMonth,
    NoSourceData,
    EmptyUpload,
    InvalidUpload,
    NotFound,
    InvalidState,
    ReplaceIncomplete,
    Store,
    Timeout,
    Report,
    Internal,
}

// O erro que efetivamente vira resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "kind": self.kind,
            "error": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::Import(_) => ErrorKind::Import,
            AppError::InvalidMonth(_) => ErrorKind::InvalidMonth,
            AppError::SameMonthDuplication(_) => ErrorKind::SameMonth,
            AppError::NoSourceData(_) => ErrorKind::NoSourceData,
            AppError::EmptyUpload => ErrorKind::EmptyUpload,
            AppError::Upload(_) => ErrorKind::InvalidUpload,
            AppError::VisitNotFound(_) | AppError::PendingUploadNotFound(_) => ErrorKind::NotFound,
            AppError::InvalidUploadState { .. } => ErrorKind::InvalidState,
            AppError::ReplaceIncomplete { .. } => ErrorKind::ReplaceIncomplete,
            AppError::Store(_) => ErrorKind::Store,
            AppError::StoreTimeout(_) => ErrorKind::Timeout,
            AppError::Report(_) => ErrorKind::Report,
            AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation
            | ErrorKind::Import
            | ErrorKind::InvalidMonth
            | ErrorKind::SameMonth
            | ErrorKind::EmptyUpload
            | ErrorKind::InvalidUpload => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NoSourceData | ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Store | ErrorKind::ReplaceIncomplete => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Report | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Mensagem para o usuário no idioma pedido (es, pt, en).
    pub fn localized(&self, lang: &str) -> String {
        let pick = |es: String, pt: String, en: String| match lang {
            "pt" => pt,
            "en" => en,
            _ => es,
        };
        match self {
            AppError::ValidationError(_) => pick(
                "Uno o más campos son inválidos.".into(),
                "Um ou mais campos são inválidos.".into(),
                "One or more fields are invalid.".into(),
            ),
            AppError::Import(e) => pick(
                format!("No se pudo importar el archivo: {e}"),
                format!("Não foi possível importar o arquivo: {e}"),
                format!("The file could not be imported: {e}"),
            ),
            AppError::InvalidMonth(raw) => pick(
                format!("Mes inválido '{raw}' (use AAAA-MM)."),
                format!("Mês inválido '{raw}' (use AAAA-MM)."),
                format!("Invalid month '{raw}' (use YYYY-MM)."),
            ),
            AppError::SameMonthDuplication(month) => pick(
                format!("El mes de origen y destino no pueden ser iguales ({month})."),
                format!("O mês de origem e o de destino não podem ser iguais ({month})."),
                format!("Source and target month cannot be the same ({month})."),
            ),
            AppError::NoSourceData(month) => pick(
                format!("No hay visitas en {month} para duplicar."),
                format!("Não há visitas em {month} para duplicar."),
                format!("There are no visits in {month} to duplicate."),
            ),
            AppError::EmptyUpload => pick(
                "El archivo no contiene visitas.".into(),
                "O arquivo não contém visitas.".into(),
                "The file contains no visits.".into(),
            ),
            AppError::Upload(reason) => pick(
                format!("Carga inválida: {reason}"),
                format!("Upload inválido: {reason}"),
                format!("Invalid upload: {reason}"),
            ),
            AppError::VisitNotFound(id) => pick(
                format!("Visita {id} no encontrada."),
                format!("Visita {id} não encontrada."),
                format!("Visit {id} not found."),
            ),
            AppError::PendingUploadNotFound(id) => pick(
                format!("La carga pendiente {id} no existe o ya fue procesada."),
                format!("O upload pendente {id} não existe ou já foi processado."),
                format!("Pending upload {id} does not exist or was already processed."),
            ),
            AppError::InvalidUploadState { from, to } => pick(
                format!("Operación no permitida en el estado actual ({from} -> {to})."),
                format!("Operação não permitida no estado atual ({from} -> {to})."),
                format!("Operation not allowed in the current state ({from} -> {to})."),
            ),
            AppError::ReplaceIncomplete { deleted, remaining, message } => {
                let remaining = remaining
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                pick(
                    format!("Se eliminaron {deleted} visitas pero la inserción falló ({message}). Visitas restantes en los meses afectados: {remaining}. Puede confirmar de nuevo para reintentar."),
                    format!("{deleted} visitas foram removidas mas a inserção falhou ({message}). Visitas restantes nos meses afetados: {remaining}. Confirme de novo para tentar outra vez."),
                    format!("{deleted} visits were deleted but the insert failed ({message}). Visits left in the affected months: {remaining}. Confirm again to retry."),
                )
            }
            // O texto do backend vai como está: é o que o usuário precisa para agir
            AppError::Store(message) => message.clone(),
            AppError::StoreTimeout(secs) => pick(
                format!("El servidor de datos no respondió en {secs} segundos."),
                format!("O servidor de dados não respondeu em {secs} segundos."),
                format!("The data server did not respond within {secs} seconds."),
            ),
            AppError::Report(_) | AppError::InternalServerError(_) => pick(
                "Ocurrió un error inesperado.".into(),
                "Ocorreu um erro inesperado.".into(),
                "An unexpected error occurred.".into(),
            ),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::Import(ImportError::InvalidRow { row, column, reason }) => Some(json!({
                "row": row,
                "column": column,
                "reason": reason,
            })),
            AppError::Import(ImportError::MissingColumn(column)) => Some(json!({ "column": column })),
            AppError::ReplaceIncomplete { deleted, remaining, .. } => Some(json!({
                "deleted": deleted,
                "remaining": remaining,
            })),
            _ => None,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }
        ApiError {
            status,
            kind: self.kind(),
            error: self.localized(&locale.0),
            details: self.details(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
