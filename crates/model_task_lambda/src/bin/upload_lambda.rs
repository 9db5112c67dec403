use std::path::{Path, PathBuf};

use aws_sdk_s3::primitives::ByteStream;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use model_task_core::contract::parse_upload_event;
use model_task_lambda::adapters::model_runner::SubprocessModelRunner;
use model_task_lambda::adapters::object_store::ObjectStore;
use model_task_lambda::handlers::upload::{
    handle_upload_event, model_log_name, UploadHandlerConfig, UploadSummary,
};

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read object from s3: {error}"))?;
                response
                    .body
                    .collect()
                    .await
                    .map(|data| data.into_bytes().to_vec())
                    .map_err(|error| format!("failed to read object body from s3: {error}"))
            })
        })
    }

    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(object_key)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write object to s3: {error}"))
            })
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .delete_object()
                    .bucket(bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to delete object from s3: {error}"))
            })
        })
    }
}

fn model_binary_path() -> PathBuf {
    if let Ok(path) = std::env::var("MODEL_BINARY") {
        return PathBuf::from(path);
    }
    let task_root = std::env::var("LAMBDA_TASK_ROOT").unwrap_or_else(|_| "/var/task".to_string());
    Path::new(&task_root).join("bin").join("model")
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<UploadSummary, Error> {
    let upload_event = parse_upload_event(event.payload)
        .map_err(|error| Error::from(error.message().to_string()))?;

    let output_bucket =
        std::env::var("OUTPUT_BUCKET").map_err(|_| Error::from("OUTPUT_BUCKET must be configured"))?;
    let binary_path = model_binary_path();
    let config = UploadHandlerConfig {
        output_bucket,
        model_log_name: model_log_name(&binary_path),
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ObjectStore {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let runner = SubprocessModelRunner::new(binary_path);

    Ok(handle_upload_event(&upload_event, &config, &runner, &store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
