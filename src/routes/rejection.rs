use serde::{Deserialize, Serialize};
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) error: BackendError,

    /// The `server-timing` value for the failed request.
    pub(crate) server_timing: String,
}

impl Rejection {
    pub fn new(error: BackendError, server_timing: String) -> Self {
        Rejection {
            error,
            server_timing,
        }
    }

    pub fn flatten(&self) -> ErrorResponse {
        ErrorResponse {
            error: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

/// The body sent back for every failed registration.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
