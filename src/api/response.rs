use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The uniform response envelope every endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "data_present"
    )]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

/// A present `data` field is `Some` even when it is an explicit `null`, so
/// `ApiResponse<Option<T>>` round-trips instead of collapsing `null` to `None`.
fn data_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A successful envelope around `data`.
pub fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
        errors: None,
        timestamp: Utc::now(),
    })
}

/// A successful envelope with no payload.
pub fn ok_empty(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: None,
        errors: None,
        timestamp: Utc::now(),
    })
}

/// The failure envelope used by the error mapping.
pub fn envelope_error(message: &str) -> ApiResponse<()> {
    ApiResponse {
        success: false,
        message: message.to_string(),
        data: None,
        errors: Some(vec![message.to_string()]),
        timestamp: Utc::now(),
    }
}
