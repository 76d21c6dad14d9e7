//! The `{success, message, data?}` envelope every HTTP endpoint returns (spec
//! §6). Grounded on the teacher's `APIResponse<A>` envelope, renamed to match
//! this system's wire contract.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Self {
            success: false,
            message: err.message.clone(),
            data: None,
        }
    }
}
