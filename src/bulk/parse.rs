//! Decomposition of bulk submissions into individual write operations.

use super::operation::{WriteOperation, normalize_document};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Type used when neither the action line nor the request path names one.
pub const DEFAULT_DOC_TYPE: &str = "_doc";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BulkParseError {
    #[error("bulk body is not valid UTF-8")]
    InvalidUtf8,
    #[error("line {line}: invalid action: {reason}")]
    InvalidAction { line: usize, reason: String },
    #[error("line {line}: unsupported action '{action}'")]
    UnsupportedAction { line: usize, action: String },
    #[error("line {line}: action is missing {field}")]
    MissingField { line: usize, field: &'static str },
    #[error("line {line}: {action} action is not followed by a document")]
    MissingDocument { line: usize, action: String },
}

#[derive(Debug, Default, Deserialize)]
struct ActionMetadata {
    #[serde(rename = "_index")]
    index: Option<String>,
    #[serde(rename = "_type")]
    doc_type: Option<String>,
    #[serde(rename = "_id")]
    id: Option<Value>,
}

/// Split a newline-delimited bulk body into write operations.
///
/// `default_index` and `default_type` come from the request path
/// (`/<index>/_bulk`, `/<index>/<type>/_bulk`) and fill in metadata the
/// action lines leave out.
pub fn parse_bulk(
    body: &[u8],
    default_index: Option<&str>,
    default_type: Option<&str>,
) -> Result<Vec<WriteOperation>, BulkParseError> {
    let text = std::str::from_utf8(body).map_err(|_| BulkParseError::InvalidUtf8)?;

    let mut operations = Vec::new();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    while let Some((line_no, line)) = lines.next() {
        let (action, metadata) = parse_action_line(line_no, line)?;

        let index = metadata
            .index
            .or_else(|| default_index.map(str::to_string))
            .ok_or(BulkParseError::MissingField {
                line: line_no,
                field: "_index",
            })?;
        let doc_type = metadata
            .doc_type
            .or_else(|| default_type.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_DOC_TYPE.to_string());
        let id = match metadata.id {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(BulkParseError::MissingField {
                    line: line_no,
                    field: "_id",
                });
            }
        };

        match action.as_str() {
            "index" | "create" => {
                let (_, document) = lines.next().ok_or_else(|| BulkParseError::MissingDocument {
                    line: line_no,
                    action: action.clone(),
                })?;
                let body = normalize_document(document.as_bytes());
                operations.push(WriteOperation::index(index, doc_type, id, body));
            }
            "delete" => operations.push(WriteOperation::delete(index, doc_type, id)),
            _ => {
                return Err(BulkParseError::UnsupportedAction {
                    line: line_no,
                    action,
                });
            }
        }
    }

    Ok(operations)
}

fn parse_action_line(
    line_no: usize,
    line: &str,
) -> Result<(String, ActionMetadata), BulkParseError> {
    let value: Value = serde_json::from_str(line).map_err(|err| BulkParseError::InvalidAction {
        line: line_no,
        reason: err.to_string(),
    })?;

    let Value::Object(map) = value else {
        return Err(BulkParseError::InvalidAction {
            line: line_no,
            reason: "expected a JSON object".into(),
        });
    };

    if map.len() != 1 {
        return Err(BulkParseError::InvalidAction {
            line: line_no,
            reason: format!("expected exactly one action, found {}", map.len()),
        });
    }

    let Some((action, metadata)) = map.into_iter().next() else {
        return Err(BulkParseError::InvalidAction {
            line: line_no,
            reason: "empty action".into(),
        });
    };

    let metadata = if metadata.is_null() {
        ActionMetadata::default()
    } else {
        serde_json::from_value(metadata).map_err(|err| BulkParseError::InvalidAction {
            line: line_no,
            reason: err.to_string(),
        })?
    };

    Ok((action, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::WriteAction;

    #[test]
    fn parses_index_and_delete_pairs() {
        let body = concat!(
            "{\"index\":{\"_index\":\"logs\",\"_type\":\"entry\",\"_id\":\"1\"}}\n",
            "{\"msg\":\"hi\"}\n",
            "{\"delete\":{\"_index\":\"logs\",\"_type\":\"entry\",\"_id\":\"2\"}}\n",
        );

        let ops = parse_bulk(body.as_bytes(), None, None).expect("valid bulk body");
        assert_eq!(
            ops,
            vec![
                WriteOperation::index("logs", "entry", "1", r#"{"msg":"hi"}"#),
                WriteOperation::delete("logs", "entry", "2"),
            ]
        );
    }

    #[test]
    fn create_is_treated_as_index() {
        let body = "{\"create\":{\"_index\":\"logs\",\"_id\":\"1\"}}\n{}\n";
        let ops = parse_bulk(body.as_bytes(), None, None).expect("valid bulk body");
        assert_eq!(ops[0].action, WriteAction::Index);
        assert_eq!(ops[0].doc_type, DEFAULT_DOC_TYPE);
    }

    #[test]
    fn path_defaults_fill_missing_metadata() {
        let body = "{\"delete\":{\"_id\":7}}";
        let ops = parse_bulk(body.as_bytes(), Some("logs"), Some("entry")).expect("valid");
        assert_eq!(ops, vec![WriteOperation::delete("logs", "entry", "7")]);
    }

    #[test]
    fn line_metadata_overrides_path_defaults() {
        let body = "{\"delete\":{\"_index\":\"other\",\"_type\":\"t\",\"_id\":\"1\"}}\n";
        let ops = parse_bulk(body.as_bytes(), Some("logs"), Some("entry")).expect("valid");
        assert_eq!(ops[0].index, "other");
        assert_eq!(ops[0].doc_type, "t");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let body = "\n{\"delete\":{\"_index\":\"a\",\"_id\":\"1\"}}\n\n\n";
        assert_eq!(parse_bulk(body.as_bytes(), None, None).expect("valid").len(), 1);
    }

    #[test]
    fn missing_index_is_rejected() {
        let body = "{\"delete\":{\"_id\":\"1\"}}\n";
        assert_eq!(
            parse_bulk(body.as_bytes(), None, None),
            Err(BulkParseError::MissingField {
                line: 1,
                field: "_index"
            })
        );
    }

    #[test]
    fn missing_id_is_rejected() {
        let body = "{\"index\":{\"_index\":\"a\"}}\n{}\n";
        assert_eq!(
            parse_bulk(body.as_bytes(), None, None),
            Err(BulkParseError::MissingField {
                line: 1,
                field: "_id"
            })
        );
    }

    #[test]
    fn missing_document_is_rejected() {
        let body = "{\"delete\":{\"_index\":\"a\",\"_id\":\"1\"}}\n{\"index\":{\"_index\":\"a\",\"_id\":\"2\"}}\n";
        assert_eq!(
            parse_bulk(body.as_bytes(), None, None),
            Err(BulkParseError::MissingDocument {
                line: 2,
                action: "index".into()
            })
        );
    }

    #[test]
    fn update_is_unsupported() {
        let body = "{\"update\":{\"_index\":\"a\",\"_id\":\"1\"}}\n{\"doc\":{}}\n";
        assert_eq!(
            parse_bulk(body.as_bytes(), None, None),
            Err(BulkParseError::UnsupportedAction {
                line: 1,
                action: "update".into()
            })
        );
    }

    #[test]
    fn garbage_action_line_reports_line_number() {
        let body = "{\"delete\":{\"_index\":\"a\",\"_id\":\"1\"}}\nnot json\n";
        assert!(matches!(
            parse_bulk(body.as_bytes(), None, None),
            Err(BulkParseError::InvalidAction { line: 2, .. })
        ));
    }

    #[test]
    fn malformed_document_line_becomes_empty_object() {
        let body = "{\"index\":{\"_index\":\"a\",\"_id\":\"1\"}}\n{broken\n";
        let ops = parse_bulk(body.as_bytes(), None, None).expect("valid");
        assert_eq!(ops[0].body.as_deref(), Some("{}"));
    }
}
