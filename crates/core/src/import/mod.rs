//! Bulk customer import from a delimited file.
//!
//! The pipeline is `parse -> normalize -> filter_valid -> submit_batch`. The
//! first three steps are synchronous and never touch the network; the last
//! step is a single request through a [`CustomerBatchGateway`].

pub mod batch;
pub mod gateway;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod schema;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::customer::StagedCustomer;
use crate::errors::ImportError;

pub use batch::{filter_valid, FilteredBatch, ValidatedBatch};
pub use gateway::{CustomerBatchGateway, GatewayError};
pub use normalize::normalize;
pub use parser::{parse, parse_with_options, ParseOptions, ParsedFile};
pub use report::{BulkUploadResponse, ImportReport, ImportStatus, ImportWarning, RejectedRow};
pub use schema::inspect_headers;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImport {
    pub import_id: Uuid,
    pub headers: Vec<String>,
    pub rows_read: usize,
    pub batch: ValidatedBatch,
    pub warnings: Vec<ImportWarning>,
}

pub fn prepare(contents: &[u8], options: &ParseOptions) -> Result<PreparedImport, ImportError> {
    prepare_with_id(Uuid::new_v4(), contents, options)
}

/// Like [`prepare`], with a caller-chosen `import_id` so failures can be
/// correlated with the pipeline's events.
pub fn prepare_with_id(
    import_id: Uuid,
    contents: &[u8],
    options: &ParseOptions,
) -> Result<PreparedImport, ImportError> {
    let parsed = parse_with_options(contents, options).map_err(|error| {
        warn!(
            event_name = "import.prepare.unreadable",
            import_id = %import_id,
            error = %error,
            "file could not be parsed"
        );
        error
    })?;
    let rows_read = parsed.lines_read();

    let mut warnings = inspect_headers(&parsed.headers);
    warnings.extend(parsed.warnings);

    let staged = parsed
        .rows
        .iter()
        .map(|row| StagedCustomer { line_number: row.line_number, customer: normalize(row) })
        .collect();

    let FilteredBatch { batch, excluded } = filter_valid(staged).map_err(|error| {
        warn!(
            event_name = "import.prepare.no_valid_rows",
            import_id = %import_id,
            rows_read,
            error = %error,
            "no row produced a customer name"
        );
        error
    })?;
    warnings.extend(excluded);

    info!(
        event_name = "import.prepare.completed",
        import_id = %import_id,
        rows_read,
        batch_size = batch.len(),
        warning_count = warnings.len(),
        "import batch prepared"
    );

    Ok(PreparedImport { import_id, headers: parsed.headers, rows_read, batch, warnings })
}

/// Sends the whole batch in one request. A failed request is reported once,
/// without per-row detail, and is not retried.
pub async fn submit_batch<G>(
    gateway: &G,
    import_id: Uuid,
    batch: ValidatedBatch,
    warnings: Vec<ImportWarning>,
) -> Result<ImportReport, ImportError>
where
    G: CustomerBatchGateway + ?Sized,
{
    let submitted = batch.len();
    let response = gateway.bulk_upload(&batch).await.map_err(|source| {
        error!(
            event_name = "import.submit.failed",
            import_id = %import_id,
            submitted,
            error = %source,
            "bulk submission failed"
        );
        ImportError::SubmissionFailed(source)
    })?;

    let report = ImportReport::from_response(import_id, submitted, response, warnings);
    match report.status() {
        ImportStatus::Completed => info!(
            event_name = "import.submit.completed",
            import_id = %import_id,
            submitted,
            created = report.created,
            "bulk submission accepted"
        ),
        ImportStatus::PartiallyRejected => warn!(
            event_name = "import.submit.partially_rejected",
            import_id = %import_id,
            submitted,
            created = report.created,
            failed = report.failed,
            "backend rejected some rows"
        ),
    }

    Ok(report)
}

/// Runs one import at a time against a backend gateway.
pub struct CustomerImporter<G> {
    gateway: G,
    options: ParseOptions,
    in_flight: AtomicBool,
}

impl<G> CustomerImporter<G>
where
    G: CustomerBatchGateway,
{
    pub fn new(gateway: G, options: ParseOptions) -> Self {
        Self { gateway, options, in_flight: AtomicBool::new(false) }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn prepare(&self, contents: &[u8]) -> Result<PreparedImport, ImportError> {
        prepare(contents, &self.options)
    }

    pub async fn run(&self, contents: &[u8]) -> Result<ImportReport, ImportError> {
        self.run_with_id(Uuid::new_v4(), contents).await
    }

    pub async fn run_with_id(
        &self,
        import_id: Uuid,
        contents: &[u8],
    ) -> Result<ImportReport, ImportError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let prepared = prepare_with_id(import_id, contents, &self.options)?;
        submit_batch(&self.gateway, prepared.import_id, prepared.batch, prepared.warnings).await
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ImportError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ImportError::AlreadyInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
