//! The module contains the errors the ledger can throw.
//!
//! The errors are layered:
//!
//! - [`ParseError`] thrown when the command arguments are not a valid transaction.
//! - [`StoreError`] thrown when the backing workbook cannot be read or written.
//! - [`EngineError`] wraps both for the callers of [`LedgerEngine`].
//!
//!  [`LedgerEngine`]: crate::LedgerEngine
use thiserror::Error;

use crate::workbook::BackendError;

/// User input faults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("kategori dan nominal wajib diisi")]
    TooFewArguments,
    #[error("kategori tidak boleh kosong")]
    EmptyCategory,
    #[error("nominal tidak valid: \"{0}\"")]
    InvalidAmount(String),
    #[error("bulan tidak valid: {0}")]
    InvalidMonth(u32),
}

/// Backend faults, as seen by the stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
}

impl StoreError {
    pub(crate) fn read(err: BackendError) -> Self {
        Self::ReadFailed(err.to_string())
    }

    pub(crate) fn write(err: BackendError) -> Self {
        Self::WriteFailed(err.to_string())
    }
}

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ParseError),
    #[error("ledger unavailable: {0}")]
    StoreUnavailable(StoreError),
    /// The ledger row was persisted but the rekap was not updated.
    #[error("rekap update failed: {0}")]
    AggregateUpdateFailed(StoreError),
    #[error("rekap is not enabled")]
    RekapDisabled,
    #[error("no ledger store configured")]
    MissingLedger,
}
