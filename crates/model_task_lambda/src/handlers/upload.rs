use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};

use model_task_core::archive::{pack_directory, unpack_archive};
use model_task_core::contract::{UploadEvent, UploadRecord};

use crate::adapters::model_runner::ModelRunner;
use crate::adapters::object_store::ObjectStore;
use crate::workspace::RunWorkspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandlerConfig {
    pub output_bucket: String,
    pub model_log_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordOutcome {
    pub bucket: String,
    pub key: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadSummary {
    pub records_processed: usize,
    pub records_failed: usize,
    pub outcomes: Vec<RecordOutcome>,
}

/// Name of the combined stdout/stderr log written next to the model outputs,
/// derived from the binary file name.
pub fn model_log_name(binary_path: &Path) -> String {
    let stem = binary_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    format!("{stem}.log")
}

/// Handle one batch of upload records.
///
/// Records are independent: each gets a fresh workspace, and a failure in one
/// never stops the rest. The packaged workspace is uploaded even when staging
/// or the model run failed, so the log and any partial outputs are still
/// delivered. The input object is only deleted once the result archive has
/// been uploaded; a delivery failure leaves the input in place for a retry.
pub fn handle_upload_event(
    event: &UploadEvent,
    config: &UploadHandlerConfig,
    runner: &impl ModelRunner,
    store: &impl ObjectStore,
) -> UploadSummary {
    let mut outcomes = Vec::with_capacity(event.records.len());
    for record in &event.records {
        outcomes.push(process_record(record, config, runner, store));
    }

    let records_failed = outcomes
        .iter()
        .filter(|outcome| outcome.status != "ok")
        .count();

    UploadSummary {
        records_processed: outcomes.len(),
        records_failed,
        outcomes,
    }
}

fn process_record(
    record: &UploadRecord,
    config: &UploadHandlerConfig,
    runner: &impl ModelRunner,
    store: &impl ObjectStore,
) -> RecordOutcome {
    let started_at = Instant::now();
    log_upload_info(
        "record_started",
        json!({"bucket": record.bucket(), "key": record.key()}),
    );

    let workspace = match RunWorkspace::create() {
        Ok(workspace) => workspace,
        Err(error) => return failed_outcome(record, started_at, error),
    };

    let run_result = stage_and_run(record, config, runner, store, &workspace);

    // Delivery happens after a failed run too, so the log and any partial
    // outputs still reach the output bucket. The input object is consumed
    // only once delivery succeeded; otherwise it survives for a retry.
    let mut errors = Vec::new();
    if let Err(error) = run_result {
        errors.push(error);
    }
    match deliver_result(record, config, store, &workspace) {
        Ok(()) => {
            if let Err(error) = store.delete_object(record.bucket(), record.key()) {
                errors.push(format!("failed to delete input object: {error}"));
            }
        }
        Err(error) => errors.push(error),
    }

    if !errors.is_empty() {
        return failed_outcome(record, started_at, errors.join("; "));
    }

    log_upload_info(
        "record_completed",
        json!({
            "bucket": record.bucket(),
            "key": record.key(),
            "duration_ms": started_at.elapsed().as_millis(),
        }),
    );
    RecordOutcome {
        bucket: record.bucket().to_string(),
        key: record.key().to_string(),
        status: "ok".to_string(),
        error: None,
    }
}

fn stage_and_run(
    record: &UploadRecord,
    config: &UploadHandlerConfig,
    runner: &impl ModelRunner,
    store: &impl ObjectStore,
    workspace: &RunWorkspace,
) -> Result<(), String> {
    let input = store
        .read_object(record.bucket(), record.key())
        .map_err(|error| format!("failed to fetch input object: {error}"))?;
    unpack_archive(&input, workspace.root()).map_err(|error| error.message().to_string())?;

    let log_path = workspace.root().join(&config.model_log_name);
    runner.run_model(workspace.root(), Some(&log_path))
}

fn deliver_result(
    record: &UploadRecord,
    config: &UploadHandlerConfig,
    store: &impl ObjectStore,
    workspace: &RunWorkspace,
) -> Result<(), String> {
    let packed = pack_directory(workspace.root()).map_err(|error| error.message().to_string())?;
    store
        .write_object(&config.output_bucket, record.key(), &packed)
        .map_err(|error| format!("failed to upload result archive: {error}"))
}

fn failed_outcome(record: &UploadRecord, started_at: Instant, error: String) -> RecordOutcome {
    log_upload_error(
        "record_failed",
        json!({
            "bucket": record.bucket(),
            "key": record.key(),
            "duration_ms": started_at.elapsed().as_millis(),
            "error": error.clone(),
        }),
    );
    RecordOutcome {
        bucket: record.bucket().to_string(),
        key: record.key().to_string(),
        status: "failed".to_string(),
        error: Some(error),
    }
}

fn log_upload_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "upload_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_upload_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "upload_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
