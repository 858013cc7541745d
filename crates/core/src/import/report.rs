use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::PARTIAL_REJECTION_MESSAGE;

/// Body returned by the bulk-upload endpoint. `errors` is omitted by the
/// backend when every row was accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUploadResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<RejectedRow>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: String,
}

/// Rows left out of the batch before submission. Never treated as errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    MalformedLine { line_number: u64, reason: String },
    MissingName { line_number: u64 },
    MissingColumn { column: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Completed,
    PartiallyRejected,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportReport {
    pub import_id: Uuid,
    pub submitted: usize,
    pub created: usize,
    pub failed: usize,
    pub server_message: String,
    pub failures: Vec<RejectedRow>,
    pub warnings: Vec<ImportWarning>,
    pub completed_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn from_response(
        import_id: Uuid,
        submitted: usize,
        response: BulkUploadResponse,
        warnings: Vec<ImportWarning>,
    ) -> Self {
        let failed = response.errors.len();
        Self {
            import_id,
            submitted,
            created: submitted.saturating_sub(failed),
            failed,
            server_message: response.message,
            failures: response.errors,
            warnings,
            completed_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ImportStatus {
        if self.failures.is_empty() {
            ImportStatus::Completed
        } else {
            ImportStatus::PartiallyRejected
        }
    }

    pub fn summary(&self) -> String {
        match self.status() {
            ImportStatus::Completed => {
                format!("{} of {} customers created", self.created, self.submitted)
            }
            ImportStatus::PartiallyRejected => format!(
                "{} {} created, {} failed",
                PARTIAL_REJECTION_MESSAGE, self.created, self.failed
            ),
        }
    }
}
