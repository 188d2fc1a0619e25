// HTTP client for the cleaning API, used by the `aibox-client` binary.

pub mod impact;

use crate::adapters::reader::read_table;
use crate::config::ClientConfig;
use crate::core::invoice::InvoiceOptions;
use crate::core::stock::StockOptions;
use crate::domain::model::{
    CleanResponse, DatasetKind, ExportFormat, InvoiceReport, StockReport, Upload,
};
use crate::utils::error::{CleanError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use impact::{ImpactEstimate, DEFAULT_HOURLY_RATE};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
const CLEAN_TIMEOUT: Duration = Duration::from_secs(120);
pub const OFFLINE_PREVIEW_ROWS: usize = 10;

/// Rows of an upload parsed on this machine, without cleaning.
#[derive(Debug, Clone)]
pub struct LocalPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn local_preview(upload: &Upload, limit: usize) -> Result<LocalPreview> {
    let table = read_table(&upload.file_name, &upload.bytes)?;
    Ok(LocalPreview {
        rows: table.preview(limit),
        columns: table.columns,
    })
}

pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `true` when `/health` answers with a success status.
    pub async fn health(&self) -> bool {
        let url = self.config.api_endpoint("/health");
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// `None` while the API is online. When it is not, the upload is read
    /// locally and its first rows are returned instead.
    pub async fn offline_preview(&self, upload: &Upload) -> Result<Option<LocalPreview>> {
        if self.health().await {
            return Ok(None);
        }
        tracing::warn!(
            "⚠️ API offline at {}, reading {} locally",
            self.config.api_url,
            upload.file_name
        );
        local_preview(upload, OFFLINE_PREVIEW_ROWS).map(Some)
    }

    pub async fn version(&self) -> Result<String> {
        let url = self.config.api_endpoint("/version");
        let body: serde_json::Value = ensure_success(self.client.get(&url).send().await?)
            .await?
            .json()
            .await?;
        Ok(body
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    pub async fn clean_invoices(
        &self,
        upload: Upload,
        options: &InvoiceOptions,
        format: ExportFormat,
    ) -> Result<CleanResponse<InvoiceReport>> {
        let params = vec![
            ("fmt", format.extension().to_string()),
            ("fuzzy", options.fuzzy_threshold.to_string()),
            ("drop_dupes", options.drop_duplicates.to_string()),
            ("drop_negative_qty", options.drop_negative_qty.to_string()),
            ("flag_due_issue", options.flag_due_before_issue.to_string()),
        ];
        self.upload("/api/clean", upload, &params).await
    }

    pub async fn clean_stock(
        &self,
        upload: Upload,
        options: &StockOptions,
        format: ExportFormat,
    ) -> Result<CleanResponse<StockReport>> {
        let params = vec![
            ("fmt", format.extension().to_string()),
            ("days_expiring", options.days_expiring.to_string()),
            ("drop_negative_qty", options.drop_negative_qty.to_string()),
        ];
        self.upload("/api/stock/clean", upload, &params).await
    }

    pub async fn download(&self, token: &str, format: ExportFormat) -> Result<Vec<u8>> {
        let url = self.config.api_endpoint(&format!("/api/download/{}", token));
        let response = self
            .client
            .get(&url)
            .query(&[("fmt", format.extension())])
            .timeout(CLEAN_TIMEOUT)
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    pub async fn sample(&self, kind: DatasetKind) -> Result<String> {
        let path = match kind {
            DatasetKind::Invoices => "/api/sample/invoice",
            DatasetKind::Stock => "/api/sample/stock",
        };
        let response = self.client.get(self.config.api_endpoint(path)).send().await?;
        Ok(ensure_success(response).await?.text().await?)
    }

    async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: Upload,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.config.api_endpoint(path);
        tracing::debug!("Uploading {} ({} bytes) to {}", upload.file_name, upload.bytes.len(), url);

        let mime = if upload.file_name.to_ascii_lowercase().ends_with(".xlsx") {
            ExportFormat::Xlsx.mime()
        } else {
            ExportFormat::Csv.mime()
        };
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .query(params)
            .multipart(form)
            .timeout(CLEAN_TIMEOUT)
            .send()
            .await?;
        tracing::debug!("API response status: {}", response.status());

        Ok(ensure_success(response).await?.json().await?)
    }
}

/// Turns a non-2xx answer into `ApiStatus`, keeping the server's `detail`.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(body);
    Err(CleanError::ApiStatus {
        status: status.as_u16(),
        body: detail,
    })
}
