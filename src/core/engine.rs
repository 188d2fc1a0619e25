use crate::adapters::export::export;
use crate::adapters::reader::read_table;
use crate::adapters::storage::ArtifactRegistry;
use crate::core::{Pipeline, Storage};
use crate::domain::model::{Artifact, CleanResponse, ExportFormat, Table, Upload};
use crate::utils::error::{CleanError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Runs uploads through a pipeline and keeps the cleaned files addressable
/// by token.
pub struct CleaningEngine<S: Storage> {
    storage: S,
    registry: ArtifactRegistry,
}

impl<S: Storage> CleaningEngine<S> {
    pub fn new(storage: S, registry: ArtifactRegistry) -> Self {
        Self { storage, registry }
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub async fn run<P: Pipeline>(
        &self,
        pipeline: P,
        upload: Upload,
        format: ExportFormat,
    ) -> Result<CleanResponse<P::Report>> {
        let started = Instant::now();
        let kind = pipeline.kind();
        tracing::info!(
            kind = kind.label(),
            file = %upload.file_name,
            bytes = upload.bytes.len(),
            "Starting cleaning job"
        );

        // Extract + Transform 屬於 CPU 工作，移到 blocking 執行緒
        let (report, data) = tokio::task::spawn_blocking(move || -> Result<_> {
            let table = read_table(&upload.file_name, &upload.bytes)?;
            tracing::debug!("Extracted {} rows, {} columns", table.len(), table.columns.len());

            pipeline.accept(&table)?;
            let outcome = pipeline.transform(table)?;
            tracing::debug!("Transformed into {} rows", outcome.table.len());

            let data = export(&outcome.table, format)?;
            Ok((outcome.report, data))
        })
        .await
        .map_err(|e| CleanError::processing(format!("cleaning task failed: {}", e)))??;

        // Load
        let token = Uuid::new_v4().to_string();
        let file_name = format!("{}_{}.{}", kind.file_prefix(), token, format.extension());
        self.storage.write_file(&file_name, &data).await?;
        tracing::debug!("Wrote {} ({} bytes)", file_name, data.len());

        self.registry
            .insert(
                token.clone(),
                Artifact {
                    file_name,
                    kind,
                    format,
                    created_at: Utc::now(),
                },
            )
            .await;

        tracing::info!(
            kind = kind.label(),
            token = %token,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Cleaning job completed"
        );

        Ok(CleanResponse {
            report,
            share_url: format!("/share/{}", token),
            download_token: token,
        })
    }

    async fn artifact(&self, token: &str) -> Result<(Artifact, Vec<u8>)> {
        let artifact = self
            .registry
            .get(token)
            .await
            .ok_or_else(|| CleanError::ArtifactNotFound {
                token: token.to_string(),
            })?;

        let data = match self.storage.read_file(&artifact.file_name).await {
            Ok(data) => data,
            Err(CleanError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CleanError::ArtifactNotFound {
                    token: token.to_string(),
                })
            }
            Err(e) => return Err(e),
        };
        Ok((artifact, data))
    }

    /// Cleaned file bytes in `format`, converted when it was stored differently.
    pub async fn download(&self, token: &str, format: ExportFormat) -> Result<Vec<u8>> {
        let (artifact, data) = self.artifact(token).await?;
        if artifact.format == format {
            return Ok(data);
        }

        tracing::debug!(
            token,
            from = artifact.format.extension(),
            to = format.extension(),
            "Converting artifact"
        );
        let table = read_table(&artifact.file_name, &data)?;
        export(&table, format)
    }

    /// Parsed cleaned table, used by the share page.
    pub async fn load_table(&self, token: &str) -> Result<(Artifact, Table)> {
        let (artifact, data) = self.artifact(token).await?;
        let table = read_table(&artifact.file_name, &data)?;
        Ok((artifact, table))
    }

    /// Forgets expired artifacts and deletes their files.
    pub async fn purge_expired(&self) -> usize {
        let expired = self.registry.take_expired().await;
        for artifact in &expired {
            if let Err(e) = self.storage.remove_file(&artifact.file_name).await {
                tracing::warn!(file = %artifact.file_name, error = %e, "Failed to remove expired artifact");
            }
        }
        if !expired.is_empty() {
            tracing::info!("🧹 Purged {} expired artifacts", expired.len());
        }
        expired.len()
    }
}

impl<S: Storage + 'static> CleaningEngine<S> {
    pub fn spawn_sweeper(
        self: Arc<Self>,
        every: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.purge_expired().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invoice::{InvoiceOptions, InvoicePipeline};
    use crate::core::stock::{StockOptions, StockPipeline};
    use crate::domain::model::{Cell, DatasetKind};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn file_names(&self) -> Vec<String> {
            self.files.lock().await.keys().cloned().collect()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                CleanError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn remove_file(&self, path: &str) -> Result<()> {
            self.files.lock().await.remove(path);
            Ok(())
        }
    }

    const INVOICES: &str = "Invoice No,Date,Client,Qty,Unit Price\n\
        INV-1,2025-09-01,Acme,2,50\n\
        INV-1,2025-09-01,Acme,2,50\n";

    fn upload(name: &str, body: &str) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_run_registers_artifact() {
        let storage = MockStorage::default();
        let engine = CleaningEngine::new(storage.clone(), ArtifactRegistry::new(None));

        let response = engine
            .run(
                InvoicePipeline::new(InvoiceOptions::default()),
                upload("inv.csv", INVOICES),
                ExportFormat::Csv,
            )
            .await
            .unwrap();

        assert_eq!(response.report.profile.duplicates_removed, 1);
        assert_eq!(response.share_url, format!("/share/{}", response.download_token));

        let names = storage.file_names().await;
        assert_eq!(names, vec![format!("aibox_inv_{}.csv", response.download_token)]);

        let artifact = engine.registry().get(&response.download_token).await.unwrap();
        assert_eq!(artifact.kind, DatasetKind::Invoices);
    }

    #[tokio::test]
    async fn test_download_converts_format() {
        let engine = CleaningEngine::new(MockStorage::default(), ArtifactRegistry::new(None));
        let response = engine
            .run(
                InvoicePipeline::default(),
                upload("inv.csv", INVOICES),
                ExportFormat::Csv,
            )
            .await
            .unwrap();

        let csv = engine
            .download(&response.download_token, ExportFormat::Csv)
            .await
            .unwrap();
        assert!(String::from_utf8(csv).unwrap().starts_with("invoice_id,issue_date"));

        let xlsx = engine
            .download(&response.download_token, ExportFormat::Xlsx)
            .await
            .unwrap();
        assert!(xlsx.starts_with(b"PK"));

        let (_, table) = engine.load_table(&response.download_token).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], Cell::Text("INV-1".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let engine = CleaningEngine::new(MockStorage::default(), ArtifactRegistry::new(None));
        let err = engine.download("nope", ExportFormat::Csv).await.unwrap_err();
        assert!(matches!(err, CleanError::ArtifactNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_stock_is_rejected() {
        let engine = CleaningEngine::new(MockStorage::default(), ArtifactRegistry::new(None));
        let err = engine
            .run(
                StockPipeline::new(StockOptions::default()),
                upload("stock.csv", "SKU,Qty\n"),
                ExportFormat::Csv,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CleanError::EmptyInput));
        assert_eq!(engine.registry().len().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired_removes_files() {
        let storage = MockStorage::default();
        let engine = CleaningEngine::new(
            storage.clone(),
            ArtifactRegistry::new(Some(chrono::Duration::zero())),
        );
        engine
            .run(InvoicePipeline::default(), upload("inv.csv", INVOICES), ExportFormat::Csv)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(engine.purge_expired().await, 1);
        assert!(storage.file_names().await.is_empty());
    }
}
