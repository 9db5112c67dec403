use std::path::{Path, PathBuf};

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use model_task_core::contract::HttpTaskResponse;
use model_task_lambda::adapters::model_runner::SubprocessModelRunner;
use model_task_lambda::handlers::request::handle_http_event;

fn model_binary_path() -> PathBuf {
    if let Ok(path) = std::env::var("MODEL_BINARY") {
        return PathBuf::from(path);
    }
    let task_root = std::env::var("LAMBDA_TASK_ROOT").unwrap_or_else(|_| "/var/task".to_string());
    Path::new(&task_root).join("bin").join("model")
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<HttpTaskResponse, Error> {
    let runner = SubprocessModelRunner::new(model_binary_path());
    handle_http_event(&event.payload, &runner).map_err(|error| Error::from(error.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
