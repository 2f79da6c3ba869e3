mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tower::ServiceExt;

use visits_backend::{
    config::{AppConfig, AppState, StoreBackend},
    db::VisitStore,
    routes,
};

use common::{date, memory_store, visit, FlakyStore};

fn memory_config() -> AppConfig {
    AppConfig {
        store_backend: StoreBackend::Memory,
        ..AppConfig::default()
    }
}

fn app(visits: Vec<visits_backend::models::Visit>) -> Router {
    app_with(memory_config(), memory_store(visits))
}

fn app_with(config: AppConfig, store: Arc<dyn VisitStore>) -> Router {
    routes::router(AppState::with_store(config, store))
}

const BOUNDARY: &str = "visits-test-boundary";

// Planilha com cabeçalho + uma linha por (data, executivo), tudo como texto
fn spreadsheet(rows: &[(&str, &str)]) -> Vec<u8> {
    let header = [
        "Fecha",
        "Ejecutivo",
        "Cadena",
        "Detalle PDV",
        "Ciudad",
        "Zona",
        "Actividad",
        "Canal",
        "Presupuesto",
    ];

    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
    for (col, name) in header.iter().enumerate() {
        sheet.get_cell_mut((col as u32 + 1, 1)).set_value(*name);
    }
    for (index, (day, executive)) in rows.iter().enumerate() {
        let row = index as u32 + 2;
        let values = [
            *day,
            *executive,
            "Éxito",
            "Éxito Unicentro",
            "Bogotá",
            "Norte",
            "Visita",
            "Moderno",
            "150000",
        ];
        for (col, value) in values.iter().enumerate() {
            sheet.get_cell_mut((col as u32 + 1, row)).set_value(*value);
        }
    }

    let mut out = Cursor::new(Vec::<u8>::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).unwrap();
    out.into_inner()
}

fn multipart_request(field: &str, file: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"visitas.xlsx\"\r\nContent-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/uploads")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_responds_ok() {
    let (status, body) = send(app(vec![]), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn created_visit_shows_up_in_filtered_list() {
    let app = app(vec![visit(date(2024, 7, 1), "Luis")]);

    let (status, created) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/visits",
            json!({
                "date": "2024-08-14",
                "executive": "Ana",
                "chain": "Olímpica",
                "city": "Medellín",
                "activity": "Impulso",
                "budget": 80000
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["activity"], "Impulso");

    let (status, list) = send(app, get("/api/visits?month=2024-08&executive=Ana")).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], created["id"]);
}

#[tokio::test]
async fn invalid_visit_is_a_localized_validation_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/visits")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::from(
            json!({
                "date": "2024-08-14",
                "executive": "",
                "chain": "Olímpica",
                "city": "Medellín",
                "activity": "Visita",
                "budget": 10
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send(app(vec![]), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn bad_month_filter_is_rejected() {
    let (status, body) = send(app(vec![]), get("/api/visits?month=agosto")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "INVALID_MONTH");
}

#[tokio::test]
async fn duplicate_endpoint_reports_empty_source_and_same_month() {
    let app = app(vec![visit(date(2024, 8, 31), "Ana")]);

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/visits/duplicate",
            json!({ "sourceMonth": "2024-07", "targetMonth": "2024-09" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NO_SOURCE_DATA");

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/visits/duplicate",
            json!({ "sourceMonth": "2024-08", "targetMonth": "2024-08" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "SAME_MONTH");

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/visits/duplicate",
            json!({ "sourceMonth": "2024-08", "targetMonth": "2024-09" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], 1);

    let (_, list) = send(app, get("/api/visits?month=2024-09")).await;
    assert_eq!(list[0]["date"], "2024-09-30");
}

#[tokio::test]
async fn unknown_visit_is_not_found() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/visits/6f1c3a2e-0000-4000-8000-000000000000")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(vec![]), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn dashboard_summarizes_filtered_visits() {
    let app = app(vec![
        visit(date(2024, 8, 1), "Ana"),
        visit(date(2024, 8, 2), "Luis"),
        visit(date(2024, 7, 2), "Ana"),
    ]);

    let (status, body) = send(app, get("/api/dashboard/summary?month=2024-08")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["totalVisits"], 2);
    assert_eq!(body["summary"]["executives"], 2);
    assert_eq!(body["months"], json!(["2024-08", "2024-07"]));
}

#[tokio::test]
async fn unknown_pending_upload_is_not_found() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/uploads/6f1c3a2e-0000-4000-8000-000000000000/confirm")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(vec![]), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = send(app(vec![]), get("/api/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/uploads/{id}/confirm"].is_object());
}

#[tokio::test]
async fn slow_store_turns_into_gateway_timeout() {
    let store = Arc::new(FlakyStore::new(vec![visit(date(2024, 8, 1), "Ana")]));
    store.set_read_delay(Duration::from_millis(500));
    let config = AppConfig {
        store_timeout: Duration::from_millis(50),
        ..memory_config()
    };

    let (status, body) = send(app_with(config, store), get("/api/dashboard/summary")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["kind"], "TIMEOUT");
}

#[tokio::test]
async fn patch_updates_and_clears_fields() {
    let existing = visit(date(2024, 8, 1), "Ana");
    let id = existing.id;
    let app = app(vec![existing]);

    let (status, _) = send(
        app.clone(),
        json_request(
            "PATCH",
            &format!("/api/visits/{id}"),
            json!({ "agent": null, "city": "Cali" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(app, get("/api/visits")).await;
    assert_eq!(list[0]["city"], "Cali");
    assert_eq!(list[0]["agent"], Value::Null);
    assert_eq!(list[0]["executive"], "Ana");
    assert_eq!(list[0]["objective"], "Exhibición");
}

#[tokio::test]
async fn patch_rejects_unknown_ids_and_blank_required_fields() {
    let existing = visit(date(2024, 8, 1), "Ana");
    let id = existing.id;
    let app = app(vec![existing]);

    let (status, body) = send(
        app.clone(),
        json_request(
            "PATCH",
            "/api/visits/6f1c3a2e-0000-4000-8000-000000000000",
            json!({ "city": "Cali" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");

    let (status, body) = send(
        app.clone(),
        json_request("PATCH", &format!("/api/visits/{id}"), json!({ "executive": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "VALIDATION");

    let (_, list) = send(app, get("/api/visits")).await;
    assert_eq!(list[0]["executive"], "Ana");
}

#[tokio::test]
async fn spreadsheet_upload_inserts_then_asks_before_replacing() {
    let app = app(vec![]);
    let file = spreadsheet(&[("2024-08-01", "Ana"), ("2024-08-02", "Luis")]);

    let (status, body) = send(app.clone(), multipart_request("file", &file)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["inserted"], 2);
    assert_eq!(body["totalVisits"], 2);

    let (status, body) = send(app.clone(), multipart_request("file", &file)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "overlapDetected");
    let pending_id = body["pendingId"].as_str().unwrap().to_string();

    let confirm = Request::builder()
        .method("POST")
        .uri(format!("/api/uploads/{pending_id}/confirm"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), confirm).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);
    assert_eq!(body["inserted"], 2);

    let (_, list) = send(app, get("/api/visits?month=2024-08")).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let file = spreadsheet(&[("2024-08-01", "Ana")]);

    let (status, body) = send(app(vec![]), multipart_request("planilha", &file)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "INVALID_UPLOAD");
}
