//! `receiptflow-dataset`: the persisted purchase dataset.
//!
//! Provides:
//! - An ordered-column, nullable-cell `Table`
//! - CSV load with required-column validation, and CSV persist
//! - `AppendTransaction`: snapshot the file, then commit the appended table

pub mod accessor;
pub mod table;
pub mod transaction;

pub use accessor::{load, missing_required, persist, validate, LoadOptions, NA_TOKENS, REQUIRED_COLUMNS};
pub use table::{Cell, Table};
pub use transaction::{backup_path_for, AppendTransaction, BACKUP_SUFFIX};
