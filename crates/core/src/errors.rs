use thiserror::Error;

use crate::import::gateway::GatewayError;

pub const NO_VALID_ROWS_MESSAGE: &str =
    "Could not find any valid customer data in the file. Please check the format.";
pub const SUBMISSION_FAILED_MESSAGE: &str =
    "Bulk upload failed. Please check your CSV and try again.";
pub const PARTIAL_REJECTION_MESSAGE: &str = "Some records failed to upload. See details below.";
pub const UNREADABLE_FILE_MESSAGE: &str =
    "The file could not be read. Please upload a CSV export within the size and row limits.";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no valid rows found ({rows_examined} rows examined)")]
    NoValidRows { rows_examined: usize },
    #[error("file could not be read as delimited data: {0}")]
    UnreadableFile(String),
    #[error("bulk submission failed: {0}")]
    SubmissionFailed(#[source] GatewayError),
    #[error("an import is already in progress")]
    AlreadyInProgress,
}

impl ImportError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::NoValidRows { .. } => "no_valid_rows",
            Self::UnreadableFile(_) => "unreadable_file",
            Self::SubmissionFailed(_) => "submission_failed",
            Self::AlreadyInProgress => "already_in_progress",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let message = self.to_string();
        match self {
            Self::NoValidRows { .. } => InterfaceError::BadRequest { message, correlation_id },
            Self::UnreadableFile(reason) => {
                InterfaceError::UnreadableFile { message: reason, correlation_id }
            }
            Self::SubmissionFailed(_) => {
                InterfaceError::ServiceUnavailable { message, correlation_id }
            }
            Self::AlreadyInProgress => InterfaceError::Conflict { message, correlation_id },
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unreadable file: {message}")]
    UnreadableFile { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Text safe to show an operator. Only an unreadable file carries its
    /// reason.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { .. } => NO_VALID_ROWS_MESSAGE.to_string(),
            Self::UnreadableFile { message, .. } => {
                format!("{UNREADABLE_FILE_MESSAGE} ({message})")
            }
            Self::Conflict { .. } => {
                "An upload is already running. Wait for it to finish.".to_string()
            }
            Self::ServiceUnavailable { .. } => SUBMISSION_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::UnreadableFile { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}
