//! Bulk-API formatting: write operations, fragments and batch payloads.

pub mod fragment;
pub mod operation;
pub mod parse;

pub use fragment::{Batch, BulkFragment, format};
pub use operation::{EMPTY_DOCUMENT, WriteAction, WriteOperation, normalize_document};
pub use parse::{BulkParseError, DEFAULT_DOC_TYPE, parse_bulk};
