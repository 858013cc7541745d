use async_trait::async_trait;
use thiserror::Error;

use crate::import::batch::ValidatedBatch;
use crate::import::report::BulkUploadResponse;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

/// Backend collaborator that creates customers in one batch request.
///
/// Implementations must not retry: a failed call is reported once.
#[async_trait]
pub trait CustomerBatchGateway: Send + Sync {
    async fn bulk_upload(&self, batch: &ValidatedBatch)
        -> Result<BulkUploadResponse, GatewayError>;
}
