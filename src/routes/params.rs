//! Path segment guards for the write routes.
//!
//! Index names and document ids may not start with `_`: such segments name
//! backend endpoints (`_search`, `_count`, `_mapping`, ...) and the request
//! forwards to the pass-through proxy instead.

use rocket::request::FromParam;
use std::fmt;
use std::ops::Deref;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("path segment is empty")]
    Empty,
    #[error("path segment '{0}' names a reserved endpoint")]
    Reserved(String),
}

fn plain_segment(param: &str) -> Result<String, SegmentError> {
    if param.is_empty() {
        Err(SegmentError::Empty)
    } else if param.starts_with('_') {
        Err(SegmentError::Reserved(param.to_string()))
    } else {
        Ok(param.to_string())
    }
}

fn non_empty_segment(param: &str) -> Result<String, SegmentError> {
    if param.is_empty() {
        Err(SegmentError::Empty)
    } else {
        Ok(param.to_string())
    }
}

macro_rules! segment_type {
    ($(#[$meta:meta])* $name:ident, $check:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'a> FromParam<'a> for $name {
            type Error = SegmentError;

            fn from_param(param: &'a str) -> Result<Self, Self::Error> {
                let check: fn(&str) -> Result<String, SegmentError> = $check;
                check(param).map($name)
            }
        }
    };
}

segment_type!(
    /// Target index of a write.
    IndexName,
    plain_segment
);

segment_type!(
    /// Mapping type of a write; `_doc` and other underscore names are allowed.
    TypeName,
    non_empty_segment
);

segment_type!(
    /// Document id of a write.
    DocumentId,
    plain_segment
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_rejects_reserved_names() {
        assert_eq!(
            IndexName::from_param("_search"),
            Err(SegmentError::Reserved("_search".into()))
        );
        assert_eq!(IndexName::from_param(""), Err(SegmentError::Empty));
        assert_eq!(&*IndexName::from_param("logs").expect("plain name"), "logs");
    }

    #[test]
    fn type_accepts_underscore_names() {
        assert_eq!(&*TypeName::from_param("_doc").expect("type"), "_doc");
        assert_eq!(TypeName::from_param(""), Err(SegmentError::Empty));
    }

    #[test]
    fn document_id_rejects_endpoint_names() {
        assert!(DocumentId::from_param("_update").is_err());
        assert_eq!(DocumentId::from_param("42").expect("id").into_inner(), "42");
    }
}
