// src/docs.rs

use axum::Json;
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Visits ---
        handlers::visits::list_visits,
        handlers::visits::create_visit,
        handlers::visits::update_visit,
        handlers::visits::delete_visit,
        handlers::visits::delete_all_visits,
        handlers::visits::duplicate_month,

        // --- Uploads ---
        handlers::uploads::upload_spreadsheet,
        handlers::uploads::get_pending_upload,
        handlers::uploads::confirm_upload,
        handlers::uploads::cancel_upload,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Reports ---
        handlers::reports::visits_pdf,
    ),
    components(
        schemas(
            // --- Visits ---
            models::visit::Activity,
            models::visit::Visit,
            models::visit::VisitDraft,
            models::visit::VisitPatch,
            handlers::visits::DuplicateMonthPayload,

            // --- Uploads ---
            models::upload::UploadState,
            models::upload::UploadOutcome,
            models::upload::ReplaceOutcome,
            models::upload::PendingUploadView,
            models::upload::DuplicationOutcome,
            handlers::uploads::UploadForm,

            // --- DASHBOARD ---
            models::dashboard::DashboardSummary,
            models::dashboard::BreakdownEntry,
            models::dashboard::DashboardView,
        )
    ),
    tags(
        (name = "Visits", description = "Cadastro e duplicação de visitas"),
        (name = "Uploads", description = "Importação de planilhas e substituição de dados"),
        (name = "Dashboard", description = "Indicadores das visitas"),
        (name = "Reports", description = "Relatórios em PDF")
    )
)]
pub struct ApiDoc;

// GET /api/openapi.json
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
