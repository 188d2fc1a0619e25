use crate::domain::model::{CleanOutcome, DatasetKind, Table};
use crate::utils::error::Result;
use serde::Serialize;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A cleaning step turning a raw table into a report plus cleaned rows.
/// Implementations are cheap option holders so they can move onto a
/// blocking worker.
pub trait Pipeline: Send + Sync + 'static {
    type Report: Serialize + Send + 'static;

    fn kind(&self) -> DatasetKind;

    /// Checks the incoming table before cleaning.
    fn accept(&self, _table: &Table) -> Result<()> {
        Ok(())
    }

    fn transform(&self, table: Table) -> Result<CleanOutcome<Self::Report>>;
}
