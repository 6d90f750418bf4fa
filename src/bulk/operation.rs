use log::warn;
use serde::{Deserialize, Serialize};

/// Document substituted when a request body cannot be read or parsed.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Kind of write carried by a [`WriteOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Index,
    Delete,
}

/// One parsed write request, ready to be formatted into a bulk fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOperation {
    pub action: WriteAction,
    pub index: String,
    pub doc_type: String,
    pub id: String,
    /// Compact JSON document. Always present for `Index`, `None` for `Delete`.
    pub body: Option<String>,
}

impl WriteOperation {
    pub fn index(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        let body = if body.is_empty() {
            EMPTY_DOCUMENT.to_string()
        } else {
            body
        };

        Self {
            action: WriteAction::Index,
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            body: Some(body),
        }
    }

    pub fn delete(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            action: WriteAction::Delete,
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            body: None,
        }
    }
}

/// Turn a raw request body into a single-line JSON document.
///
/// Trailing newlines are dropped. Bodies that are empty, not UTF-8 or not
/// JSON are replaced by `{}`; pretty-printed JSON is re-serialized onto one
/// line so it cannot break the line-delimited bulk grammar.
pub fn normalize_document(raw: &[u8]) -> String {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim_end_matches(['\n', '\r']),
        Err(err) => {
            warn!("document body is not valid UTF-8 ({}), substituting {{}}", err);
            return EMPTY_DOCUMENT.to_string();
        }
    };

    if text.trim().is_empty() {
        warn!("document body is empty, substituting {{}}");
        return EMPTY_DOCUMENT.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) if text.contains(['\n', '\r']) => {
            serde_json::to_string(&value).unwrap_or_else(|_| EMPTY_DOCUMENT.to_string())
        }
        Ok(_) => text.to_string(),
        Err(err) => {
            warn!("document body is not valid JSON ({}), substituting {{}}", err);
            EMPTY_DOCUMENT.to_string()
        }
    }
}
