//! HTTP plumbing shared by the provider and news source adapters.

use crate::error::ServiceError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Constructor for the service-specific failure variant
pub type FailureKind = fn(String) -> ServiceError;

pub fn build_http_client(failed: FailureKind) -> Result<Client, ServiceError> {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| failed(format!("Failed to create HTTP client: {}", e)))
}

pub fn map_http_error(error: reqwest::Error, failed: FailureKind) -> ServiceError {
    if let Some(status) = error.status() {
        return map_status(status, error.to_string(), failed);
    }
    if error.is_timeout() {
        failed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        failed(format!("Connection error: {}", error))
    } else {
        failed(format!("HTTP error: {}", error))
    }
}

pub fn map_status(status: StatusCode, detail: String, failed: FailureKind) -> ServiceError {
    match status.as_u16() {
        401 | 403 => ServiceError::AuthFailed(format!("status {}: {}", status, detail)),
        429 => ServiceError::RateLimited(format!("status {}: {}", status, detail)),
        _ => failed(format!("Request failed with status {}: {}", status, detail)),
    }
}

/// Turn a non-success response into the matching error, passing successes through.
pub async fn check_status(response: Response, failed: FailureKind) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status(status, error_text, failed))
}
