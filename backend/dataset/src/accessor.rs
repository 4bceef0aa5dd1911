//! Dataset load/validate/persist over CSV files.

use std::io;
use std::path::Path;

use receiptflow_core::PipelineError;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::table::{Cell, Table};

/// Columns every dataset must carry, non-null.
pub const REQUIRED_COLUMNS: [&str; 3] = ["uid", "long", "lat"];

/// Field values read as null, in addition to the empty field.
pub const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Options scoped to a single parse call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Pad short rows without logging a warning for each one.
    pub quiet: bool,
}

/// Load and validate the dataset at `path`.
pub async fn load(path: &Path, options: LoadOptions) -> Result<Table, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::NotFound(path.to_path_buf()));
    }

    let raw = fs::read(path)
        .await
        .map_err(|e| PipelineError::Format(format!("{}: {e}", path.display())))?;
    let table = parse(&raw, options)?;
    validate(&table)?;

    info!(path = %path.display(), rows = table.len(), columns = table.columns().len(), "Loaded dataset");
    Ok(table)
}

fn parse(raw: &[u8], options: LoadOptions) -> Result<Table, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::Format(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(PipelineError::Format("no columns to parse".into()));
    }

    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    for (i, name) in columns.iter().enumerate() {
        if columns[..i].contains(name) {
            return Err(PipelineError::Format(format!("duplicate column '{name}'")));
        }
    }

    let mut table = Table::new(columns);
    let width = headers.len();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PipelineError::Format(e.to_string()))?;
        // Line numbers are 1-based and the header occupies line 1.
        let line = line + 2;
        if record.len() > width {
            return Err(PipelineError::Format(format!(
                "line {line}: expected {width} fields, saw {}",
                record.len()
            )));
        }
        let mut row: Vec<Cell> = record
            .iter()
            .map(|v| if is_na(v) { None } else { Some(v.to_string()) })
            .collect();
        if row.len() < width {
            if !options.quiet {
                warn!(line, fields = row.len(), expected = width, "Short row padded with nulls");
            }
            row.resize(width, None);
        }
        table.push_row(row)?;
    }
    Ok(table)
}

pub(crate) fn is_na(value: &str) -> bool {
    value.is_empty() || NA_TOKENS.contains(&value)
}

/// First required column holding nulls, with its null count.
pub fn missing_required(table: &Table) -> Option<(&'static str, usize)> {
    REQUIRED_COLUMNS.into_iter().find_map(|name| {
        let nulls = table.column(name)?.filter(Option::is_none).count();
        (nulls > 0).then_some((name, nulls))
    })
}

/// Check the structural invariants of a loaded dataset.
pub fn validate(table: &Table) -> Result<(), PipelineError> {
    if table.is_empty() {
        return Err(PipelineError::Schema(
            "dataset is empty; please check the dataset file".into(),
        ));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.column_index(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema(format!(
            "dataset missing required columns: {}",
            missing.join(", ")
        )));
    }

    if let Some((name, nulls)) = missing_required(table) {
        return Err(PipelineError::Schema(format!(
            "dataset contains {nulls} missing values in required column '{name}'"
        )));
    }
    Ok(())
}

/// Overwrite `path` with the full table.
///
/// Writes to a sibling temp file, then renames over the original.
pub async fn persist(table: &Table, path: &Path) -> io::Result<()> {
    let bytes = serialize(table)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, &bytes).await?;
    fs::rename(tmp_path, path).await?;

    debug!(path = %path.display(), rows = table.len(), bytes = bytes.len(), "Persisted dataset");
    Ok(())
}

fn serialize(table: &Table) -> io::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_dataset(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("purchases.csv");
        fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn loads_valid_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long,lat,product\nu1,106.8,-6.2,milk\nu2,106.9,-6.1,\n").await;

        let table = load(&path, LoadOptions::default()).await.unwrap();
        let expected = Table::from_rows(
            &["uid", "long", "lat", "product"],
            &[&["u1", "106.8", "-6.2", "milk"], &["u2", "106.9", "-6.1", ""]],
        )
        .unwrap();
        assert_eq!(table, expected);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.csv"), LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn empty_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "").await;
        let err = load(&path, LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "format");
    }

    #[tokio::test]
    async fn long_row_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long,lat\nu1,1,2,3\n").await;
        let err = load(&path, LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "format");
    }

    #[tokio::test]
    async fn header_only_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long,lat\n").await;
        let err = load(&path, LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "schema");
    }

    #[tokio::test]
    async fn missing_required_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long\nu1,1\n").await;
        let err = load(&path, LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "schema");
        assert!(err.to_string().contains("lat"));
    }

    #[tokio::test]
    async fn short_row_nulls_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long,lat\nu1,1,2\nu2,3\n").await;
        let err = load(&path, LoadOptions { quiet: true }).await.unwrap_err();
        assert_eq!(err.kind(), "schema");
        assert!(err.to_string().contains("'lat'"));
    }

    #[tokio::test]
    async fn na_tokens_in_required_column_are_schema_errors() {
        let dir = tempfile::tempdir().unwrap();
        for contents in ["uid,long,lat\nu1,NaN,2\n", "uid,long,lat\nu1,1,NA\n", "uid,long,lat\nnull,1,2\n"] {
            let path = write_dataset(&dir, contents).await;
            let err = load(&path, LoadOptions::default()).await.unwrap_err();
            assert_eq!(err.kind(), "schema", "{contents}");
        }
    }

    #[tokio::test]
    async fn na_tokens_in_optional_column_load_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long,lat,product\nu1,1,2,N/A\nu2,3,4,NAN\n").await;
        let table = load(&path, LoadOptions::default()).await.unwrap();
        assert_eq!(table.rows()[0][3], None);
        assert_eq!(table.rows()[1][3].as_deref(), Some("NAN"));
    }

    #[test]
    fn missing_required_reports_first_null_column() {
        let table = Table::from_rows(&["uid", "long", "lat"], &[&["u1", "1", ""], &["u2", "", ""]]).unwrap();
        assert_eq!(missing_required(&table), Some(("long", 1)));
        let full = Table::from_rows(&["uid", "long", "lat"], &[&["u1", "1", "2"]]).unwrap();
        assert_eq!(missing_required(&full), None);
    }

    #[tokio::test]
    async fn short_row_padded_in_optional_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(&dir, "uid,long,lat,product\nu1,1,2\n").await;
        let table = load(&path, LoadOptions { quiet: true }).await.unwrap();
        assert_eq!(table.rows()[0][3], None);
    }

    #[tokio::test]
    async fn persist_then_load_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = Table::from_rows(
            &["uid", "long", "lat", "store"],
            &[&["u1", "1.5", "2.5", "Toko, Jaya"], &["u2", "3", "4", ""]],
        )
        .unwrap();

        persist(&table, &path).await.unwrap();
        let loaded = load(&path, LoadOptions::default()).await.unwrap();
        assert_eq!(loaded, table);
        assert!(!dir.path().join("out.csv.tmp").exists());
    }
}
