//! Local runtime for exercising the request handler outside Lambda.
//!
//! Usage: `task_runtime '<event json>'` with `MODEL_BINARY` pointing at the
//! model executable. Without an argument an empty event is handled, which
//! prints the usage text envelope.

use std::path::PathBuf;

use serde_json::{json, Value};

use model_task_lambda::adapters::model_runner::SubprocessModelRunner;
use model_task_lambda::handlers::request::handle_http_event;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let event: Value = match std::env::args().nth(1) {
        Some(raw) => serde_json::from_str(&raw)?,
        None => json!({}),
    };

    let binary_path: PathBuf = std::env::var("MODEL_BINARY")
        .map_err(|_| "MODEL_BINARY must be configured")?
        .into();
    let runner = SubprocessModelRunner::new(binary_path);

    let response = handle_http_event(&event, &runner).map_err(|error| error.message)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
