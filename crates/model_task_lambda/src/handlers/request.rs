use std::time::Instant;

use serde_json::{json, Value};

use model_task_core::archive::{decode_body, encode_body, pack_directory, unpack_archive};
use model_task_core::contract::{parse_http_event, HttpTaskEvent, HttpTaskResponse};

use crate::adapters::model_runner::ModelRunner;
use crate::workspace::RunWorkspace;

/// Usage text returned for GET requests (and requests without a method).
pub const HANDLER_DOC: &str = "Run the model binary on demand.\n\n\
POST a base64-encoded tar-gzip archive of input files. The model runs in a \
fresh working directory seeded with those files, and the response body is a \
base64-encoded tar-gzip archive of the model's output directory.\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandlerError {
    pub message: String,
}

impl RequestHandlerError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Handle one HTTP-style invocation.
///
/// GET (or a missing method) returns the usage text, POST runs the model on
/// the decoded body, and any other method is answered with 405. Model and
/// staging failures on POST are returned as errors so the platform surfaces
/// them.
pub fn handle_http_event(
    event: &Value,
    runner: &impl ModelRunner,
) -> Result<HttpTaskResponse, RequestHandlerError> {
    let event = parse_http_event(event.clone())
        .map_err(|error| RequestHandlerError::new(error.message()))?;

    match event.http_method.as_deref() {
        None | Some("GET") => Ok(usage_response()),
        Some("POST") => run_model_task(&event, runner),
        Some(other) => Ok(method_not_allowed(other)),
    }
}

fn run_model_task(
    event: &HttpTaskEvent,
    runner: &impl ModelRunner,
) -> Result<HttpTaskResponse, RequestHandlerError> {
    let started_at = Instant::now();
    log_request_info("run_started", json!({"body_present": event.body.is_some()}));

    let body = event
        .body
        .as_deref()
        .ok_or_else(|| RequestHandlerError::new("POST request must include a body"))?;
    let input = decode_body(body).map_err(|error| RequestHandlerError::new(error.message()))?;

    let workspace =
        RunWorkspace::create().map_err(RequestHandlerError::new)?;
    unpack_archive(&input, workspace.root())
        .map_err(|error| RequestHandlerError::new(error.message()))?;

    runner
        .run_model(workspace.root(), None)
        .map_err(|error| {
            log_request_error(
                "run_failed",
                json!({
                    "duration_ms": started_at.elapsed().as_millis(),
                    "error": error.clone(),
                }),
            );
            RequestHandlerError::new(error)
        })?;

    let packed = pack_directory(workspace.output_dir())
        .map_err(|error| RequestHandlerError::new(error.message()))?;

    log_request_info(
        "run_completed",
        json!({
            "duration_ms": started_at.elapsed().as_millis(),
            "result_bytes": packed.len(),
        }),
    );

    Ok(HttpTaskResponse {
        status_code: 200,
        body: encode_body(&packed),
        headers: json!({"content-type": "application/octet-stream"}),
        is_base64_encoded: true,
    })
}

fn usage_response() -> HttpTaskResponse {
    HttpTaskResponse {
        status_code: 200,
        body: HANDLER_DOC.to_string(),
        headers: json!({"content-type": "text/plain"}),
        is_base64_encoded: false,
    }
}

fn method_not_allowed(method: &str) -> HttpTaskResponse {
    HttpTaskResponse {
        status_code: 405,
        body: format!("{method}: HTTP method not supported"),
        headers: json!({"content-type": "text/plain"}),
        is_base64_encoded: false,
    }
}

fn log_request_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "request_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_request_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "request_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    struct PassRunner;

    impl ModelRunner for PassRunner {
        fn run_model(&self, workdir: &Path, _log_path: Option<&Path>) -> Result<(), String> {
            // Pretend the model consumed the staged input and produced output.
            if !workdir.join("input.nml").is_file() {
                return Err("staged input is missing".to_string());
            }
            fs::write(workdir.join("output").join("result.nc"), b"netcdf bytes")
                .map_err(|error| error.to_string())?;
            Ok(())
        }
    }

    struct FailingRunner;

    impl ModelRunner for FailingRunner {
        fn run_model(&self, _workdir: &Path, _log_path: Option<&Path>) -> Result<(), String> {
            Err("model binary exited with status 1".to_string())
        }
    }

    fn post_event_with_input() -> Value {
        let staging = TempDir::new().expect("tempdir should create");
        fs::write(staging.path().join("input.nml"), "&config /\n")
            .expect("input file should write");
        let archive = pack_directory(staging.path()).expect("input should pack");
        json!({"httpMethod": "POST", "body": encode_body(&archive), "isBase64Encoded": true})
    }

    #[test]
    fn missing_method_returns_usage_text() {
        let response =
            handle_http_event(&json!({}), &PassRunner).expect("handler should succeed");
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, HANDLER_DOC);
        assert!(!response.is_base64_encoded);
    }

    #[test]
    fn get_returns_usage_text() {
        let response = handle_http_event(&json!({"httpMethod": "GET"}), &PassRunner)
            .expect("handler should succeed");
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, HANDLER_DOC);
    }

    #[test]
    fn unsupported_methods_yield_405() {
        for method in ["PUT", "DELETE"] {
            let response = handle_http_event(&json!({"httpMethod": method}), &PassRunner)
                .expect("handler should succeed");
            assert_eq!(response.status_code, 405);
            assert_eq!(response.body, format!("{method}: HTTP method not supported"));
        }
    }

    #[test]
    fn post_round_trips_archive_through_model_run() {
        let response = handle_http_event(&post_event_with_input(), &PassRunner)
            .expect("handler should succeed");

        assert_eq!(response.status_code, 200);
        assert!(response.is_base64_encoded);
        assert_eq!(
            response.headers,
            json!({"content-type": "application/octet-stream"})
        );

        let result = decode_body(&response.body).expect("response body should decode");
        let unpacked = TempDir::new().expect("tempdir should create");
        unpack_archive(&result, unpacked.path()).expect("result should unpack");
        assert_eq!(
            fs::read(unpacked.path().join("result.nc")).expect("result file should exist"),
            b"netcdf bytes"
        );
    }

    #[test]
    fn post_without_body_fails() {
        let error = handle_http_event(&json!({"httpMethod": "POST"}), &PassRunner)
            .expect_err("handler should fail");
        assert_eq!(error.message, "POST request must include a body");
    }

    #[test]
    fn post_with_invalid_base64_fails() {
        let event = json!({"httpMethod": "POST", "body": "not base64!!"});
        let error =
            handle_http_event(&event, &PassRunner).expect_err("handler should fail");
        assert!(error.message.starts_with("Request body is not valid base64"));
    }

    #[test]
    fn model_failure_is_surfaced() {
        let error = handle_http_event(&post_event_with_input(), &FailingRunner)
            .expect_err("handler should fail");
        assert_eq!(error.message, "model binary exited with status 1");
    }

    #[test]
    fn process_working_directory_is_unchanged() {
        let original = std::env::current_dir().expect("cwd should be readable");

        handle_http_event(&post_event_with_input(), &PassRunner)
            .expect("handler should succeed");
        handle_http_event(&post_event_with_input(), &FailingRunner)
            .expect_err("handler should fail");

        assert_eq!(
            std::env::current_dir().expect("cwd should be readable"),
            original
        );
    }
}
