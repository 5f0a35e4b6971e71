//! Error body returned by every failing endpoint.

use serde::{Deserialize, Serialize};

/// JSON error body: `{"status": 404, "msg": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The HTTP status code.
    pub status: u16,

    /// A human-readable message. Never carries internal error text.
    pub msg: String,

    /// Request ID for debugging purposes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    // Common error constructors
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(400, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(401, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(404, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(405, "not allowed method")
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::new(429, msg)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "internal server error")
    }
}
