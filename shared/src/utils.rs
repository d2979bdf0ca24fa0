use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Response shape returned by every function: a status code and a
/// JSON-encoded body string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status_code: u16, body: String) -> Self {
        Self { status_code, body }
    }
}

pub fn json_response<T: Serialize>(status_code: u16, body: &T) -> Result<ApiResponse, Error> {
    Ok(ApiResponse::new(status_code, serde_json::to_string(body)?))
}

pub fn error_response(
    status_code: u16,
    message: &str,
    records_processed: Option<usize>,
) -> Result<ApiResponse, Error> {
    let body = match records_processed {
        Some(records_processed) => json!({
            "error": message,
            "records_processed": records_processed,
        }),
        None => json!({ "error": message }),
    };
    json_response(status_code, &body)
}
