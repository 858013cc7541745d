use std::fs;
use std::path::Path;

use pestpro_api::HttpBackend;
use pestpro_core::import::{self, CustomerImporter, ImportReport, ImportStatus};
use pestpro_core::ImportError;
use serde_json::json;
use uuid::Uuid;

use crate::commands::{
    load_config, runtime, CommandResult, EXIT_INVALID_FILE, EXIT_IO, EXIT_PARTIAL,
    EXIT_RUNTIME, EXIT_SUBMISSION,
};

const COMMAND: &str = "import";

pub fn run(file: &Path, dry_run: bool) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let options = config.import.parse_options();
    let import_id = Uuid::new_v4();

    let size = match fs::metadata(file) {
        Ok(metadata) => metadata.len(),
        Err(error) => return file_read_failure(file, &error),
    };
    if size > options.max_file_bytes as u64 {
        let error = ImportError::UnreadableFile(format!(
            "file is {size} bytes, limit is {}",
            options.max_file_bytes
        ));
        return import_failure(import_id, error);
    }

    let contents = match fs::read(file) {
        Ok(contents) => contents,
        Err(error) => return file_read_failure(file, &error),
    };

    if dry_run {
        return match import::prepare_with_id(import_id, &contents, &options) {
            Ok(prepared) => CommandResult::success_with_details(
                COMMAND,
                format!(
                    "dry run: {} of {} rows ready to submit",
                    prepared.batch.len(),
                    prepared.rows_read
                ),
                Some(json!({
                    "import_id": prepared.import_id,
                    "rows_read": prepared.rows_read,
                    "batch_size": prepared.batch.len(),
                    "customers": prepared.batch.customers(),
                    "warnings": prepared.warnings,
                })),
            ),
            Err(error) => import_failure(import_id, error),
        };
    }

    let backend = match HttpBackend::from_config(&config.api) {
        Ok(backend) => backend,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "client_init",
                format!("failed to build backend client: {error}"),
                EXIT_RUNTIME,
            );
        }
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let importer = CustomerImporter::new(backend, options);
    match runtime.block_on(importer.run_with_id(import_id, &contents)) {
        Ok(report) => report_result(&report),
        Err(error) => import_failure(import_id, error),
    }
}

fn file_read_failure(file: &Path, error: &std::io::Error) -> CommandResult {
    CommandResult::failure(
        COMMAND,
        "file_read",
        format!("could not read `{}`: {error}", file.display()),
        EXIT_IO,
    )
}

fn report_result(report: &ImportReport) -> CommandResult {
    let details = serde_json::to_value(report).ok();
    match report.status() {
        ImportStatus::Completed => {
            CommandResult::success_with_details(COMMAND, report.summary(), details)
        }
        ImportStatus::PartiallyRejected => CommandResult::failure_with_details(
            COMMAND,
            "partial_rejection",
            report.summary(),
            EXIT_PARTIAL,
            details,
        ),
    }
}

fn import_failure(import_id: Uuid, error: ImportError) -> CommandResult {
    let error_class = error.error_class();
    let exit_code = match error {
        ImportError::NoValidRows { .. } | ImportError::UnreadableFile(_) => EXIT_INVALID_FILE,
        ImportError::SubmissionFailed(_) | ImportError::AlreadyInProgress => EXIT_SUBMISSION,
    };
    let detail = error.to_string();
    let interface = error.into_interface(import_id.to_string());
    tracing::warn!(
        event_name = "cli.import.failed",
        import_id = %import_id,
        error_class,
        detail = %detail,
        "import command failed"
    );

    CommandResult::failure_with_details(
        COMMAND,
        error_class,
        interface.user_message(),
        exit_code,
        Some(json!({ "detail": detail, "correlation_id": interface.correlation_id() })),
    )
}
