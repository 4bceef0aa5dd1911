use receiptflow_core::PipelineError;
use receiptflow_dataset::{missing_required, Table};

/// The extracted record must carry exactly the dataset's columns, in the
/// same order, so appending cannot shift historical columns.
pub fn reconcile(dataset: &Table, record: &Table) -> Result<(), PipelineError> {
    if dataset.columns() == record.columns() {
        return Ok(());
    }
    Err(PipelineError::SchemaMismatch {
        expected: dataset.columns().to_vec(),
        found: record.columns().to_vec(),
    })
}

/// Every extracted row must fill the dataset's required columns; a null
/// there would make the committed file fail its next load.
pub fn require_complete(record: &Table) -> Result<(), PipelineError> {
    match missing_required(record) {
        Some((column, nulls)) => Err(PipelineError::Extraction(format!(
            "extracted record has {nulls} missing values in required column '{column}'"
        ))),
        None => Ok(()),
    }
}
