use aibox::api::samples::{SAMPLE_INVOICES, SAMPLE_STOCK};
use aibox::client::{ApiClient, ImpactEstimate, DEFAULT_HOURLY_RATE};
use aibox::core::invoice::InvoiceOptions;
use aibox::core::stock::StockOptions;
use aibox::domain::model::{DatasetKind, ExportFormat, Upload};
use aibox::{
    router, AppState, ArtifactRegistry, CleanError, CleaningEngine, ClientConfig, LocalStorage,
    Settings,
};
use httpmock::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

/// 啟動真實的 API server，回傳其 base URL
async fn spawn_server(dir: &TempDir) -> String {
    let settings = Settings {
        artifact_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let engine = Arc::new(CleaningEngine::new(
        LocalStorage::new(dir.path()),
        ArtifactRegistry::new(None),
    ));
    let app = router(AppState::new(engine, &settings));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn upload(name: &str, body: &str) -> Upload {
    Upload {
        file_name: name.to_string(),
        bytes: body.as_bytes().to_vec(),
    }
}

#[tokio::test]
async fn test_invoice_round_trip_through_server() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = ApiClient::new(ClientConfig::new(
        base,
        Some("http://localhost:8000".to_string()),
    ));

    assert!(client.health().await);
    assert_eq!(client.version().await.unwrap(), env!("CARGO_PKG_VERSION"));

    let response = client
        .clean_invoices(
            upload("invoices.csv", SAMPLE_INVOICES),
            &InvoiceOptions::default(),
            ExportFormat::Csv,
        )
        .await
        .unwrap();

    assert_eq!(response.report.profile.rows_in, 4);
    assert_eq!(response.report.profile.duplicates_removed, 1);
    assert!(!response.report.ai_feedback.is_empty());

    let impact = ImpactEstimate::from_profile(&response.report.profile, DEFAULT_HOURLY_RATE);
    assert!(impact.minutes_saved >= 0.5);

    assert_eq!(
        client.config().public_link(&response.share_url),
        format!("http://localhost:8000/share/{}", response.download_token)
    );

    let xlsx = client
        .download(&response.download_token, ExportFormat::Xlsx)
        .await
        .unwrap();
    assert!(xlsx.starts_with(b"PK"));
}

#[tokio::test]
async fn test_stock_and_samples_through_server() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = ApiClient::new(ClientConfig::new(base, None));

    let sample = client.sample(DatasetKind::Stock).await.unwrap();
    assert_eq!(sample, SAMPLE_STOCK);

    let options = StockOptions {
        days_expiring: 30,
        drop_negative_qty: false,
        ..Default::default()
    };
    let response = client
        .clean_stock(upload("stock.csv", &sample), &options, ExportFormat::Csv)
        .await
        .unwrap();
    assert_eq!(response.report.profile.rows_in, 5);
    assert_eq!(response.report.profile.rows_out, 5);
    assert!(response.report.issues_summary.contains_key("NEGATIVE_QTY"));

    let csv = client
        .download(&response.download_token, ExportFormat::Csv)
        .await
        .unwrap();
    assert!(String::from_utf8(csv).unwrap().starts_with("sku,"));
}

#[tokio::test]
async fn test_server_errors_become_api_status() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = ApiClient::new(ClientConfig::new(base, None));

    let err = client
        .download("missing-token", ExportFormat::Csv)
        .await
        .unwrap_err();
    match err {
        CleanError::ApiStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Token expired or not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_clean_request_parameters() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/clean")
            .query_param("fmt", "xlsx")
            .query_param("fuzzy", "80")
            .query_param("drop_dupes", "false")
            .query_param("drop_negative_qty", "true")
            .query_param("flag_due_issue", "true");
        then.status(500)
            .json_body(serde_json::json!({"detail": "Failed to write cleaned file: disk full"}));
    });

    let client = ApiClient::new(ClientConfig::new(server.base_url(), None));
    let options = InvoiceOptions {
        fuzzy_threshold: 80,
        drop_duplicates: false,
        drop_negative_qty: true,
        flag_due_before_issue: true,
    };
    let err = client
        .clean_invoices(upload("a.csv", SAMPLE_INVOICES), &options, ExportFormat::Xlsx)
        .await
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, CleanError::ApiStatus { status: 500, .. }));
}
