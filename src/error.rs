use crate::backend::ProxyError;
use crate::batch::EnqueueError;
use crate::bulk::BulkParseError;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde::Serialize;
use std::io::Cursor;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge(usize),
    ServiceUnavailable(String),
    BadGateway(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::PayloadTooLarge(limit) => {
                log::debug!("request body exceeds {} bytes", limit);
                (
                    Status::PayloadTooLarge,
                    "PayloadTooLarge",
                    format!("request body exceeds {limit} bytes"),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                log::warn!("write rejected: {}", msg);
                (Status::ServiceUnavailable, "ServiceUnavailable", msg)
            }
            ApiError::BadGateway(msg) => {
                log::error!("backend unreachable: {}", msg);
                (Status::BadGateway, "BadGateway", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl From<EnqueueError> for ApiError {
    fn from(err: EnqueueError) -> Self {
        ApiError::ServiceUnavailable(err.to_string())
    }
}

impl From<BulkParseError> for ApiError {
    fn from(err: BulkParseError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Method(_) => ApiError::BadRequest(err.to_string()),
            ProxyError::Config(_) => ApiError::InternalError(err.to_string()),
            ProxyError::Http(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}
