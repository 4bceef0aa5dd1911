//! Snapshot-then-commit append discipline for the dataset file.
//!
//! The snapshot is left in place after commit and never rolled back
//! automatically; it is the recovery point for external tooling.

use std::path::{Path, PathBuf};

use receiptflow_core::PipelineError;
use tokio::fs;
use tracing::{error, info};

use crate::accessor::persist;
use crate::table::Table;

/// Suffix appended to the dataset file name for its snapshot.
pub const BACKUP_SUFFIX: &str = ".backup";

/// `<dataset>.backup`, next to the dataset.
pub fn backup_path_for(dataset_path: &Path) -> PathBuf {
    let mut name = dataset_path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// An in-flight append against one dataset file.
///
/// Exists only after the snapshot has been written, so a commit can never
/// precede its snapshot.
#[derive(Debug)]
pub struct AppendTransaction {
    dataset_path: PathBuf,
    snapshot_path: PathBuf,
}

impl AppendTransaction {
    /// Copy the dataset byte-for-byte to its snapshot path, replacing any
    /// previous snapshot.
    pub async fn begin(dataset_path: &Path) -> Result<Self, PipelineError> {
        let snapshot_path = backup_path_for(dataset_path);
        fs::copy(dataset_path, &snapshot_path)
            .await
            .map_err(|source| PipelineError::Backup {
                path: snapshot_path.clone(),
                source,
            })?;

        info!(path = %snapshot_path.display(), "Backup created");
        Ok(Self {
            dataset_path: dataset_path.to_path_buf(),
            snapshot_path,
        })
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Append `record` after the rows of `base` and write the result over the
    /// dataset file. Returns the updated table.
    pub async fn append(self, mut base: Table, record: Table) -> Result<Table, PipelineError> {
        base.append(record)?;
        self.commit(&base).await?;
        Ok(base)
    }

    /// Write `table` over the dataset file.
    pub async fn commit(self, table: &Table) -> Result<(), PipelineError> {
        if let Err(source) = persist(table, &self.dataset_path).await {
            error!(
                path = %self.dataset_path.display(),
                backup = %self.snapshot_path.display(),
                "Dataset write failed; backup holds the last known good copy"
            );
            return Err(PipelineError::Persist {
                path: self.dataset_path,
                source,
            });
        }

        info!(path = %self.dataset_path.display(), rows = table.len(), "Dataset updated and saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{load, LoadOptions};

    const ORIGINAL: &str = "uid,long,lat\nu1,1,2\nu2,3,4\n";

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path_for(Path::new("/data/purchases.csv")),
            PathBuf::from("/data/purchases.csv.backup")
        );
    }

    #[tokio::test]
    async fn append_snapshots_then_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purchases.csv");
        fs::write(&path, ORIGINAL).await.unwrap();
        fs::write(backup_path_for(&path), "stale").await.unwrap();

        let base = load(&path, LoadOptions::default()).await.unwrap();
        let record = Table::from_rows(&["uid", "long", "lat"], &[&["u3", "5", "6"]]).unwrap();

        let tx = AppendTransaction::begin(&path).await.unwrap();
        assert_eq!(tx.snapshot_path(), backup_path_for(&path));
        let updated = tx.append(base, record).await.unwrap();

        assert_eq!(fs::read_to_string(backup_path_for(&path)).await.unwrap(), ORIGINAL);
        let reloaded = load(&path, LoadOptions::default()).await.unwrap();
        assert_eq!(reloaded, updated);
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.rows()[2][0].as_deref(), Some("u3"));
    }

    #[tokio::test]
    async fn backup_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppendTransaction::begin(&dir.path().join("missing.csv")).await.unwrap_err();
        assert_eq!(err.kind(), "backup");
    }

    #[tokio::test]
    async fn persist_failure_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purchases.csv");
        fs::write(&path, ORIGINAL).await.unwrap();
        let tx = AppendTransaction::begin(&path).await.unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(dir.path().join("purchases.csv.tmp")).await.unwrap();
        let table = Table::from_rows(&["uid", "long", "lat"], &[&["u1", "1", "2"]]).unwrap();
        let err = tx.commit(&table).await.unwrap_err();

        assert_eq!(err.kind(), "persist");
        assert_eq!(fs::read_to_string(backup_path_for(&path)).await.unwrap(), ORIGINAL);
        assert_eq!(fs::read_to_string(&path).await.unwrap(), ORIGINAL);
    }
}
