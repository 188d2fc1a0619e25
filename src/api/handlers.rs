use super::error::ApiError;
use super::AppState;
use crate::adapters::reader::ALLOWED_EXTENSIONS;
use crate::adapters::share::render_share_page;
use crate::core::invoice::{InvoiceOptions, InvoicePipeline};
use crate::core::stock::{StockOptions, StockPipeline};
use crate::domain::model::{CleanResponse, ExportFormat, InvoiceReport, StockReport, Upload};
use crate::utils::error::CleanError;
use crate::utils::validation::{validate_file_extension, validate_range, Validate};
use axum::{
    extract::{rejection::QueryRejection, Multipart, Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

const UPLOAD_FIELD: &str = "file";

fn default_fmt() -> String {
    "csv".to_string()
}

fn default_fuzzy() -> i64 {
    90
}

fn default_days_expiring() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean '{}'",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    #[serde(default = "default_fmt")]
    pub fmt: String,
    #[serde(default = "default_fuzzy")]
    pub fuzzy: i64,
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub drop_dupes: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub drop_negative_qty: bool,
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub flag_due_issue: bool,
}

impl InvoiceQuery {
    fn options(&self) -> Result<InvoiceOptions, ApiError> {
        validate_range("fuzzy", self.fuzzy, 0, 100)?;
        let options = InvoiceOptions {
            fuzzy_threshold: self.fuzzy as u8,
            drop_duplicates: self.drop_dupes,
            drop_negative_qty: self.drop_negative_qty,
            flag_due_before_issue: self.flag_due_issue,
        };
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    #[serde(default = "default_fmt")]
    pub fmt: String,
    #[serde(default = "default_days_expiring")]
    pub days_expiring: i64,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub drop_negative_qty: bool,
}

impl StockQuery {
    fn options(&self) -> Result<StockOptions, ApiError> {
        let days_expiring =
            u32::try_from(self.days_expiring).map_err(|_| CleanError::InvalidConfigValueError {
                field: "days_expiring".to_string(),
                value: self.days_expiring.to_string(),
                reason: "Value must be a non-negative number of days".to_string(),
            })?;
        Ok(StockOptions {
            days_expiring,
            drop_negative_qty: self.drop_negative_qty,
            ..Default::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default = "default_fmt")]
    pub fmt: String,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Reads the `file` form field, rejecting unknown extensions before the
/// body is buffered.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        validate_file_extension(UPLOAD_FIELD, &file_name, ALLOWED_EXTENSIONS)
            .map_err(|_| ApiError::unsupported_file())?;

        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::too_large(max_bytes)
            } else {
                ApiError::new(e.status(), e.body_text())
            }
        })?;
        if bytes.len() > max_bytes {
            return Err(CleanError::PayloadTooLarge {
                size: bytes.len(),
                max: max_bytes,
            }
            .into());
        }

        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::new(
        axum::http::StatusCode::UNPROCESSABLE_ENTITY,
        "Missing form field 'file'",
    ))
}

pub async fn root() -> Json<Value> {
    Json(json!({ "name": "AI-in-a-Box API", "status": "ok" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

#[tracing::instrument(skip(state, query, multipart))]
pub async fn clean_invoices(
    State(state): State<AppState>,
    query: Result<Query<InvoiceQuery>, QueryRejection>,
    multipart: Multipart,
) -> Result<Json<CleanResponse<InvoiceReport>>, ApiError> {
    let query = query_params(query)?;
    let options = query.options()?;
    let upload = read_upload(multipart, state.max_upload_bytes).await?;

    let response = state
        .engine
        .run(
            InvoicePipeline::new(options),
            upload,
            ExportFormat::parse_lenient(&query.fmt),
        )
        .await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, query, multipart))]
pub async fn clean_stock(
    State(state): State<AppState>,
    query: Result<Query<StockQuery>, QueryRejection>,
    multipart: Multipart,
) -> Result<Json<CleanResponse<StockReport>>, ApiError> {
    let query = query_params(query)?;
    let options = query.options()?;
    let upload = read_upload(multipart, state.max_upload_bytes).await?;

    let response = state
        .engine
        .run(
            StockPipeline::new(options),
            upload,
            ExportFormat::parse_lenient(&query.fmt),
        )
        .await
        .map_err(|e| match e {
            CleanError::CsvError(_) | CleanError::WorkbookReadError(_) => {
                ApiError::bad_request(format!("Could not process stock file: {}", e))
            }
            other => other.into(),
        })?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, query))]
pub async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = query_params(query)?;
    let format = ExportFormat::parse_lenient(&query.fmt);
    let data = state.engine.download(&token, format).await?;

    Ok((
        [
            (CONTENT_TYPE, format.mime().to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"cleaned.{}\"", format.extension()),
            ),
        ],
        data,
    )
        .into_response())
}

#[tracing::instrument(skip(state))]
pub async fn share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Html<String>, ApiError> {
    let (artifact, table) = state.engine.load_table(&token).await?;
    Ok(Html(render_share_page(
        &table,
        artifact.kind,
        state.share_row_limit,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_query(raw: &str) -> InvoiceQuery {
        parse_query(raw)
    }

    fn parse_query<T: serde::de::DeserializeOwned>(raw: &str) -> T {
        let uri: axum::http::Uri = format!("http://localhost/api/clean?{}", raw).parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_invoice_query_defaults() {
        let q = invoice_query("");
        assert_eq!(q.fmt, "csv");
        let options = q.options().unwrap();
        assert_eq!(options, InvoiceOptions::default());
    }

    #[test]
    fn test_flags_accept_capitalized_booleans() {
        let q = invoice_query("drop_dupes=False&drop_negative_qty=True&flag_due_issue=0&fuzzy=85");
        let options = q.options().unwrap();
        assert!(!options.drop_duplicates);
        assert!(options.drop_negative_qty);
        assert!(!options.flag_due_before_issue);
        assert_eq!(options.fuzzy_threshold, 85);
    }

    #[test]
    fn test_fuzzy_out_of_range() {
        let q = invoice_query("fuzzy=101");
        assert_eq!(q.options().unwrap_err().status, axum::http::StatusCode::BAD_REQUEST);
        let q = invoice_query("fuzzy=-1");
        assert!(q.options().is_err());
    }

    #[test]
    fn test_stock_query() {
        let q: StockQuery = parse_query("days_expiring=7&fmt=xlsx");
        let options = q.options().unwrap();
        assert_eq!(options.days_expiring, 7);
        assert!(!options.drop_negative_qty);
        assert_eq!(ExportFormat::parse_lenient(&q.fmt), ExportFormat::Xlsx);
    }

    #[test]
    fn test_days_expiring_has_no_upper_cap() {
        let q: StockQuery = parse_query("days_expiring=36500");
        assert_eq!(q.options().unwrap().days_expiring, 36500);

        let q: StockQuery = parse_query("days_expiring=-1");
        let err = q.options().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(err.detail.contains("days_expiring"));
    }
}
