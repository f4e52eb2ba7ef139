//! Crate-wide error taxonomy (spec §7).
//!
//! Every PLDM command handler converts an `Err` here into a completion-code
//! only response; see [`PldmError::completion_code`].

use thiserror::Error;

use crate::messages::completion_code::CompletionCode;

#[derive(Debug, Error)]
pub enum PldmError {
    #[error("invalid length")]
    InvalidLength,

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("not ready")]
    NotReady,

    #[error("invalid record handle")]
    InvalidRecordHandle,

    #[error("no free instance id slot for this EID")]
    NoFreeSlot,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("duplicate entry")]
    Duplicate,

    #[error("queue full")]
    Full,

    #[error("CRC-32 checksum mismatch")]
    ChecksumMismatch,

    #[error("no handler registered")]
    HandlerMissing,

    #[error("internal failure: {0}")]
    InternalFailure(String),

    #[error("JSON descriptor error: {0}")]
    Json(#[from] JsonIngestError),
}

/// Wraps [`serde_json::Error`] and plain file-system errors encountered
/// while ingesting a PDR or BIOS JSON descriptor.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct JsonIngestError(pub String);

impl From<serde_json::Error> for JsonIngestError {
    fn from(e: serde_json::Error) -> Self {
        JsonIngestError(e.to_string())
    }
}

impl PldmError {
    /// Maps every error variant onto the PLDM completion code returned in a
    /// response that carries no payload beyond the header (spec §7).
    pub fn completion_code(&self) -> CompletionCode {
        match self {
            PldmError::InvalidLength => CompletionCode::ErrorInvalidLength,
            PldmError::InvalidData(_) => CompletionCode::ErrorInvalidData,
            PldmError::NotReady => CompletionCode::ErrorNotReady,
            PldmError::InvalidRecordHandle => CompletionCode::InvalidRecordHandle,
            PldmError::NoFreeSlot => CompletionCode::ErrorInvalidData,
            PldmError::SendFailed(_) => CompletionCode::Error,
            PldmError::DecodeFailed(_) => CompletionCode::ErrorInvalidData,
            PldmError::Timeout => CompletionCode::Error,
            PldmError::Duplicate => CompletionCode::ErrorInvalidData,
            PldmError::Full => CompletionCode::ErrorInvalidData,
            PldmError::ChecksumMismatch => CompletionCode::ErrorInvalidData,
            PldmError::HandlerMissing => CompletionCode::ErrorUnsupportedPldmCmd,
            PldmError::InternalFailure(_) => CompletionCode::Error,
            PldmError::Json(_) => CompletionCode::ErrorInvalidData,
        }
    }

    pub(crate) fn invalid_data(text: impl Into<String>) -> Self {
        PldmError::InvalidData(text.into())
    }

    pub(crate) fn decode_failed(text: impl Into<String>) -> Self {
        PldmError::DecodeFailed(text.into())
    }
}

pub type PldmResult<T> = Result<T, PldmError>;
