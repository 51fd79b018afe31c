use serde::{Deserialize, Serialize};

/// Response envelope wrapping every backend payload
///
/// `{ "success": true, "data": {...}, "message": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
