use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP-style invocation event as delivered by an API gateway integration.
///
/// Only the fields the handlers consult are modelled; everything else in the
/// platform payload is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpTaskEvent {
    #[serde(rename = "httpMethod", skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "isBase64Encoded", skip_serializing_if = "Option::is_none")]
    pub is_base64_encoded: Option<bool>,
}

/// HTTP-style response envelope returned to the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpTaskResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    pub headers: Value,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

/// Object-storage upload notification carrying one or more records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadEvent {
    #[serde(rename = "Records")]
    pub records: Vec<UploadRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadRecord {
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectRef {
    pub key: String,
}

impl UploadRecord {
    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    pub fn key(&self) -> &str {
        &self.s3.object.key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Parse the raw platform payload into an [`HttpTaskEvent`].
///
/// A null payload is treated as an empty event (direct test invocations pass
/// no event at all); a missing `httpMethod` is left for the handler to default.
pub fn parse_http_event(event: Value) -> Result<HttpTaskEvent, ValidationError> {
    match event {
        Value::Null => Ok(HttpTaskEvent::default()),
        Value::Object(_) => serde_json::from_value(event)
            .map_err(|error| ValidationError::new(format!("Malformed request event: {error}"))),
        _ => Err(ValidationError::new("Request event must be a JSON object")),
    }
}

/// Parse the raw platform payload into an [`UploadEvent`].
pub fn parse_upload_event(event: Value) -> Result<UploadEvent, ValidationError> {
    serde_json::from_value(event)
        .map_err(|error| ValidationError::new(format!("Malformed upload event: {error}")))
}
