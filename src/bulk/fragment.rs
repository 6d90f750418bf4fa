use super::operation::{WriteAction, WriteOperation};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One formatted operation's contribution to a bulk payload.
///
/// Always ends with exactly one newline. Cloning shares the underlying text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFragment(Arc<str>);

impl BulkFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BulkFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct ActionMetadata<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum ActionLine<'a> {
    Index(ActionMetadata<'a>),
    Delete(ActionMetadata<'a>),
}

/// Format a write operation into its bulk-API lines.
///
/// `Index` yields the action line followed by the document line; `Delete`
/// yields only the action line.
pub fn format(op: &WriteOperation) -> BulkFragment {
    let metadata = ActionMetadata {
        index: &op.index,
        doc_type: &op.doc_type,
        id: &op.id,
    };
    let action = match op.action {
        WriteAction::Index => ActionLine::Index(metadata),
        WriteAction::Delete => ActionLine::Delete(metadata),
    };

    // Serializing borrowed strings into a String has no failure mode.
    let mut text = serde_json::to_string(&action).expect("action metadata serializes");
    text.push('\n');

    if op.action == WriteAction::Index {
        let body = op.body.as_deref().unwrap_or(super::EMPTY_DOCUMENT);
        text.push_str(body.trim_end_matches(['\n', '\r']));
        text.push('\n');
    }

    BulkFragment(text.into())
}

/// Fragments drained together and delivered as one bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    fragments: Vec<BulkFragment>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: BulkFragment) {
        self.fragments.push(fragment);
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.fragments.iter().map(BulkFragment::len).sum()
    }

    pub fn fragments(&self) -> &[BulkFragment] {
        &self.fragments
    }

    /// Concatenate the fragments in drain order into a bulk request body.
    pub fn into_payload(self) -> String {
        let mut payload = String::with_capacity(self.byte_len());
        for fragment in &self.fragments {
            payload.push_str(fragment.as_str());
        }
        payload
    }
}

impl From<Vec<BulkFragment>> for Batch {
    fn from(fragments: Vec<BulkFragment>) -> Self {
        Self { fragments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_fragment_matches_bulk_grammar() {
        let op = WriteOperation::index("logs", "entry", "42", r#"{"msg":"hi"}"#);
        assert_eq!(
            format(&op).as_str(),
            "{\"index\":{\"_index\":\"logs\",\"_type\":\"entry\",\"_id\":\"42\"}}\n{\"msg\":\"hi\"}\n"
        );
    }

    #[test]
    fn delete_fragment_has_no_body_line() {
        let op = WriteOperation::delete("logs", "entry", "42");
        assert_eq!(
            format(&op).as_str(),
            "{\"delete\":{\"_index\":\"logs\",\"_type\":\"entry\",\"_id\":\"42\"}}\n"
        );
    }

    #[test]
    fn delete_ignores_stray_body() {
        let mut op = WriteOperation::delete("logs", "entry", "42");
        op.body = Some(r#"{"ignored":true}"#.into());
        assert_eq!(format(&op).as_str().lines().count(), 1);
    }

    #[test]
    fn trailing_newlines_collapse_to_one() {
        let op = WriteOperation::index("logs", "entry", "1", "{\"a\":1}\n\n\n");
        assert!(format(&op).as_str().ends_with("{\"a\":1}\n"));
        assert!(!format(&op).as_str().ends_with("\n\n"));
    }

    #[test]
    fn metadata_is_json_escaped() {
        let op = WriteOperation::delete("lo\"gs", "en\\try", "4 2");
        let fragment = format(&op);
        let line = fragment.as_str().trim_end();
        let parsed: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
        assert_eq!(parsed["delete"]["_index"], "lo\"gs");
        assert_eq!(parsed["delete"]["_type"], "en\\try");
        assert_eq!(parsed["delete"]["_id"], "4 2");
    }

    #[test]
    fn batch_payload_concatenates_in_order() {
        let mut batch = Batch::new();
        batch.push(format(&WriteOperation::delete("a", "t", "1")));
        batch.push(format(&WriteOperation::index("b", "t", "2", "{}")));

        assert_eq!(batch.len(), 2);
        let expected_len = batch.byte_len();
        let payload = batch.into_payload();
        assert_eq!(payload.len(), expected_len);
        assert!(payload.starts_with("{\"delete\""));
        assert!(payload.ends_with("{}\n"));
    }
}
