//! Shared helper functions for Rocket route handlers.

use crate::error::ApiError;
use rocket::data::{Data, ToByteUnit};
use std::io;

pub enum BodyError {
    TooLarge(usize),
    Io(io::Error),
}

impl From<BodyError> for ApiError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::TooLarge(limit) => ApiError::PayloadTooLarge(limit),
            BodyError::Io(err) => ApiError::BadRequest(format!("failed to read request body: {err}")),
        }
    }
}

/// Read a request body completely, refusing bodies over `limit` bytes.
pub async fn read_body(data: Data<'_>, limit: usize) -> Result<Vec<u8>, BodyError> {
    let capped = data
        .open(limit.bytes())
        .into_bytes()
        .await
        .map_err(BodyError::Io)?;

    if !capped.is_complete() {
        return Err(BodyError::TooLarge(limit));
    }

    Ok(capped.into_inner())
}
