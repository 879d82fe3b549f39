//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;

use serde::Serialize;

/// `{"success": true, "data": ...}` envelope for read endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
