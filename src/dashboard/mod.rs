// Browser dashboard: upload forms and cleaning reports, backed by the API.

pub mod views;

use crate::api::samples::{SAMPLE_INVOICES, SAMPLE_STOCK};
use crate::client::{ApiClient, ImpactEstimate, DEFAULT_HOURLY_RATE};
use crate::core::invoice::InvoiceOptions;
use crate::core::stock::StockOptions;
use crate::domain::model::{DatasetKind, ExportFormat, Upload};
use crate::utils::error::CleanError;
use crate::utils::validation::Validate;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct DashboardState {
    pub client: Arc<ApiClient>,
    pub max_upload_bytes: usize,
}

impl DashboardState {
    pub fn new(client: ApiClient, max_upload_bytes: usize) -> Self {
        Self {
            client: Arc::new(client),
            max_upload_bytes,
        }
    }
}

pub fn dashboard_router(state: DashboardState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/invoices", post(clean_invoices))
        .route("/stock", post(clean_stock))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rendered as an HTML error page.
#[derive(Debug)]
pub struct DashboardError {
    pub status: StatusCode,
    pub message: String,
    pub suggestion: Option<&'static str>,
}

impl From<CleanError> for DashboardError {
    fn from(e: CleanError) -> Self {
        let status = match &e {
            CleanError::ApiStatus { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            CleanError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_input_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        let message = match &e {
            CleanError::ApiStatus { status, body } => format!("API error: {} ({})", body, status),
            other => other.to_string(),
        };
        Self {
            status,
            message,
            suggestion: Some(e.recovery_suggestion()),
        }
    }
}

impl From<MultipartError> for DashboardError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
            suggestion: None,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        tracing::warn!(status = %self.status, detail = %self.message, "Dashboard request failed");
        (
            self.status,
            Html(views::error_page(&self.message, self.suggestion)),
        )
            .into_response()
    }
}

/// Text fields plus the optional file of an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    upload: Option<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, DashboardError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // 瀏覽器未選檔時仍會送出空的 file 欄位
                if !file_name.is_empty() {
                    form.upload = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Checkboxes are only submitted when ticked.
    fn flag(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .is_some_and(|v| matches!(v.trim(), "on" | "true" | "1"))
    }

    fn number<T: FromStr>(&self, name: &str, default: T) -> Result<T, CleanError> {
        match self.fields.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse().map_err(|_| CleanError::InvalidConfigValueError {
                field: name.to_string(),
                value: raw.to_string(),
                reason: "Not a number".to_string(),
            }),
        }
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::parse_lenient(self.fields.get("fmt").map_or("csv", String::as_str))
    }

    /// The uploaded file, or the built-in sample when none was chosen.
    fn take_upload(&mut self, kind: DatasetKind) -> Result<Upload, CleanError> {
        if let Some(upload) = self.upload.take() {
            return Ok(upload);
        }
        if !self.flag("sample") {
            return Err(CleanError::MissingConfigError {
                field: "file".to_string(),
            });
        }
        let (file_name, body) = match kind {
            DatasetKind::Invoices => ("demo_invoices.csv", SAMPLE_INVOICES),
            DatasetKind::Stock => ("demo_stock.csv", SAMPLE_STOCK),
        };
        Ok(Upload {
            file_name: file_name.to_string(),
            bytes: body.as_bytes().to_vec(),
        })
    }
}

async fn index(State(state): State<DashboardState>) -> Html<String> {
    let online = state.client.health().await;
    Html(views::index_page(state.client.config(), online))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[tracing::instrument(skip(state, multipart))]
async fn clean_invoices(
    State(state): State<DashboardState>,
    multipart: Multipart,
) -> Result<Html<String>, DashboardError> {
    let mut form = UploadForm::read(multipart).await?;
    let options = InvoiceOptions {
        fuzzy_threshold: form.number("fuzzy", 90)?,
        drop_duplicates: form.flag("drop_dupes"),
        drop_negative_qty: form.flag("drop_negative_qty"),
        flag_due_before_issue: form.flag("flag_due_issue"),
    };
    options.validate()?;
    let hourly_rate: f64 = form.number("hourly_rate", DEFAULT_HOURLY_RATE)?;
    if !hourly_rate.is_finite() || hourly_rate < 0.0 {
        return Err(CleanError::InvalidConfigValueError {
            field: "hourly_rate".to_string(),
            value: hourly_rate.to_string(),
            reason: "Value must be a non-negative amount".to_string(),
        }
        .into());
    }
    let format = form.format();
    let upload = form.take_upload(DatasetKind::Invoices)?;

    if let Some(preview) = state.client.offline_preview(&upload).await? {
        return Ok(Html(views::local_preview_page(
            &state.client.config().api_url,
            &preview,
        )));
    }

    let response = state.client.clean_invoices(upload, &options, format).await?;
    tracing::info!(
        "✅ Invoices cleaned: {} → {} rows",
        response.report.profile.rows_in,
        response.report.profile.rows_out
    );
    let impact = ImpactEstimate::from_profile(&response.report.profile, hourly_rate);
    Ok(Html(views::invoice_result(
        state.client.config(),
        &response,
        &impact,
        format,
    )))
}

#[tracing::instrument(skip(state, multipart))]
async fn clean_stock(
    State(state): State<DashboardState>,
    multipart: Multipart,
) -> Result<Html<String>, DashboardError> {
    let mut form = UploadForm::read(multipart).await?;
    let options = StockOptions {
        days_expiring: form.number("days_expiring", 30)?,
        drop_negative_qty: form.flag("drop_negative_qty"),
        ..Default::default()
    };
    let format = form.format();
    let upload = form.take_upload(DatasetKind::Stock)?;

    if let Some(preview) = state.client.offline_preview(&upload).await? {
        return Ok(Html(views::local_preview_page(
            &state.client.config().api_url,
            &preview,
        )));
    }

    let response = state.client.clean_stock(upload, &options, format).await?;
    tracing::info!(
        "✅ Stock cleaned: {} → {} rows",
        response.report.profile.rows_in,
        response.report.profile.rows_out
    );
    Ok(Html(views::stock_result(state.client.config(), &response, format)))
}
