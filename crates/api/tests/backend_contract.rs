use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use pestpro_api::{HttpBackend, LoginError};
use pestpro_core::config::{ApiConfig, AppConfig};
use pestpro_core::import::{CustomerImporter, GatewayError, ImportStatus, ParseOptions};
use pestpro_core::ImportError;
use serde_json::{json, Value};

const UPLOAD: &[u8] = b"First Name,Last Name,Email Address,Phone 1,Billing Address,City\n\
Jane,Doe,jane@example.test,(555) 123-4567,123 Main St,Springfield\n\
,,nobody@example.test,,,\n\
John,Roe,john@example.test,555.987.6543,9 Elm St,\n";

#[derive(Clone, Default)]
struct Backend {
    existing_names: Vec<String>,
    received: Arc<Mutex<Vec<Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

async fn bulk_upload(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    if let Ok(mut slot) = backend.authorization.lock() {
        *slot = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }
    if let Ok(mut received) = backend.received.lock() {
        received.push(body.clone());
    }

    let customers = body["customers"].as_array().cloned().unwrap_or_default();
    let errors: Vec<Value> = customers
        .iter()
        .filter(|customer| {
            let name = customer["name"].as_str().unwrap_or_default();
            backend.existing_names.iter().any(|existing| existing == name)
        })
        .map(|customer| json!({ "data": customer, "error": "Customer already exists" }))
        .collect();

    Json(json!({
        "message": format!("Processed {} records.", customers.len()),
        "errors": errors,
    }))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "admin@pestpro.test" {
        (
            StatusCode::OK,
            Json(json!({
                "message": "Login Successful",
                "user": { "email": "admin@pestpro.test", "role": "Admin" }
            })),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" })))
    }
}

async fn failing_upload() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database is locked")
}

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
    let address = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{address}")
}

fn api_config(base_url: String) -> ApiConfig {
    ApiConfig { base_url, timeout_secs: 5, ..AppConfig::default().api }
}

fn backend_router(backend: Backend) -> Router {
    Router::new()
        .route("/api/customers/bulk-upload", post(bulk_upload))
        .route("/api/auth/login", post(login))
        .route("/api/users", get(|| async { Json(json!([])) }))
        .with_state(backend)
}

#[tokio::test]
async fn bulk_upload_sends_only_named_rows_and_itemizes_rejections() {
    let backend = Backend { existing_names: vec!["John Roe".to_string()], ..Backend::default() };
    let base_url = spawn_backend(backend_router(backend.clone())).await;
    let client = HttpBackend::from_config(&api_config(base_url)).expect("client");
    let importer = CustomerImporter::new(client, ParseOptions::default());

    let report = importer.run(UPLOAD).await.expect("import should reach the backend");

    let received = backend.received.lock().expect("received lock").clone();
    assert_eq!(received.len(), 1, "exactly one batch request");
    assert_eq!(
        received[0],
        json!({
            "customers": [
                {
                    "name": "Jane Doe",
                    "email": "jane@example.test",
                    "phone": "5551234567",
                    "address": "123 Main St, Springfield"
                },
                {
                    "name": "John Roe",
                    "email": "john@example.test",
                    "phone": "5559876543",
                    "address": "9 Elm St"
                }
            ]
        })
    );

    assert_eq!(report.status(), ImportStatus::PartiallyRejected);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].error, "Customer already exists");
    assert_eq!(report.failures[0].data["name"], "John Roe");
    assert_eq!(report.server_message, "Processed 2 records.");
}

#[tokio::test]
async fn bearer_token_is_forwarded_when_configured() {
    let backend = Backend::default();
    let base_url = spawn_backend(backend_router(backend.clone())).await;
    let config = ApiConfig { auth_token: Some("abc123".to_string().into()), ..api_config(base_url) };
    let client = HttpBackend::from_config(&config).expect("client");
    let importer = CustomerImporter::new(client, ParseOptions::default());

    importer.run(UPLOAD).await.expect("import should succeed");

    let authorization = backend.authorization.lock().expect("auth lock").clone();
    assert_eq!(authorization.as_deref(), Some("Bearer abc123"));
}

#[tokio::test]
async fn server_error_is_a_total_failure() {
    let router = Router::new().route("/api/customers/bulk-upload", post(failing_upload));
    let base_url = spawn_backend(router).await;
    let importer = CustomerImporter::new(
        HttpBackend::from_config(&api_config(base_url)).expect("client"),
        ParseOptions::default(),
    );

    let result = importer.run(UPLOAD).await;

    match result {
        Err(ImportError::SubmissionFailed(GatewayError::Status { status, body })) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database is locked");
        }
        other => panic!("expected status failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);

    let importer = CustomerImporter::new(
        HttpBackend::from_config(&api_config(format!("http://{address}"))).expect("client"),
        ParseOptions::default(),
    );

    let result = importer.run(UPLOAD).await;

    assert!(matches!(result, Err(ImportError::SubmissionFailed(GatewayError::Transport(_)))));
}

#[tokio::test]
async fn login_returns_user_or_unknown_user() {
    let base_url = spawn_backend(backend_router(Backend::default())).await;
    let client = HttpBackend::from_config(&api_config(base_url)).expect("client");

    let user = client.login("admin@pestpro.test").await.expect("known user");
    assert_eq!(user.email, "admin@pestpro.test");
    assert_eq!(user.role, "Admin");

    let missing = client.login("ghost@pestpro.test").await;
    assert!(matches!(
        missing,
        Err(LoginError::UnknownUser(ref email)) if email == "ghost@pestpro.test"
    ));
}

#[tokio::test]
async fn probe_reports_http_status() {
    let base_url = spawn_backend(backend_router(Backend::default())).await;
    let client = HttpBackend::from_config(&api_config(base_url)).expect("client");

    assert_eq!(client.probe().await.expect("reachable"), 200);
}
