//! Single-document writes: `PUT|POST|DELETE /<index>/<type>/<id>`.

use crate::batch::Accumulator;
use crate::bulk::{WriteOperation, format, normalize_document};
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::models::AcceptedResponse;
use crate::routes::helpers::{BodyError, read_body};
use crate::routes::params::{DocumentId, IndexName, TypeName};
use rocket::data::Data;
use rocket::response::status::Accepted;
use rocket::serde::json::Json;
use rocket::{State, delete, post, put};
use std::sync::Arc;

type WriteResult = Result<Accepted<Json<AcceptedResponse>>, ApiError>;

/// Queue a document create/replace.
#[put("/<index>/<doc_type>/<id>", data = "<body>")]
pub async fn put_document(
    index: IndexName,
    doc_type: TypeName,
    id: DocumentId,
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> WriteResult {
    index_document(index, doc_type, id, body, accumulator, config).await
}

/// Same as [`put_document`]; the backend accepts both verbs.
#[post("/<index>/<doc_type>/<id>", data = "<body>")]
pub async fn post_document(
    index: IndexName,
    doc_type: TypeName,
    id: DocumentId,
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> WriteResult {
    index_document(index, doc_type, id, body, accumulator, config).await
}

/// Queue a document delete.
#[delete("/<index>/<doc_type>/<id>")]
pub fn delete_document(
    index: IndexName,
    doc_type: TypeName,
    id: DocumentId,
    accumulator: &State<Arc<Accumulator>>,
) -> WriteResult {
    let operation = WriteOperation::delete(index.into_inner(), doc_type.into_inner(), id.into_inner());
    accumulator.enqueue(format(&operation))?;

    Ok(Accepted(Json(AcceptedResponse { accepted: 1 })))
}

async fn index_document(
    index: IndexName,
    doc_type: TypeName,
    id: DocumentId,
    body: Data<'_>,
    accumulator: &Accumulator,
    config: &GatewayConfig,
) -> WriteResult {
    let raw = match read_body(body, config.max_body_bytes).await {
        Ok(raw) => raw,
        Err(BodyError::Io(err)) => {
            log::warn!("failed to read body for {}/{}/{}: {}", index, doc_type, id, err);
            Vec::new()
        }
        Err(err) => return Err(err.into()),
    };

    let operation = WriteOperation::index(
        index.into_inner(),
        doc_type.into_inner(),
        id.into_inner(),
        normalize_document(&raw),
    );
    accumulator.enqueue(format(&operation))?;

    Ok(Accepted(Json(AcceptedResponse { accepted: 1 })))
}
