// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::{config::AppState, docs, handlers};

pub fn router(app_state: AppState) -> Router {
    let visit_routes = Router::new()
        .route(
            "/api/visits",
            get(handlers::visits::list_visits)
                .post(handlers::visits::create_visit)
                .delete(handlers::visits::delete_all_visits),
        )
        .route("/api/visits/duplicate", post(handlers::visits::duplicate_month))
        .route(
            "/api/visits/{id}",
            patch(handlers::visits::update_visit).delete(handlers::visits::delete_visit),
        );

    // O limite padrão do axum (2 MiB) é pequeno para planilhas
    let upload_routes = Router::new()
        .route("/api/uploads", post(handlers::uploads::upload_spreadsheet))
        .route(
            "/api/uploads/{id}",
            get(handlers::uploads::get_pending_upload).delete(handlers::uploads::cancel_upload),
        )
        .route("/api/uploads/{id}/confirm", post(handlers::uploads::confirm_upload))
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes));

    let insight_routes = Router::new()
        .route("/api/dashboard/summary", get(handlers::dashboard::get_summary))
        .route("/api/reports/visits.pdf", get(handlers::reports::visits_pdf));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/openapi.json", get(docs::openapi))
        .merge(visit_routes)
        .merge(upload_routes)
        .merge(insight_routes)
        .with_state(app_state)
}
