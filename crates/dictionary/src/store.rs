use std::time::Instant;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// FetchedTerm is the raw result of a term lookup: the stored fields the
/// projection retains, plus the flattened type-term keys of the term's
/// outgoing enumeration edges.
#[derive(Debug, Clone)]
pub struct FetchedTerm {
    pub key: String,
    pub data: Option<Value>,
    pub rule: Option<Value>,
    pub edge_paths: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store request timed out")]
    Timeout,
    #[error("store error: {0}")]
    Backend(String),
}

/// Store is the dictionary-store boundary: term documents, enumeration
/// edges, the code-section search view, and document existence probes.
/// Implementations do no caching and no projection. Any operation may
/// block on I/O; `deadline` bounds how long it may do so.
pub trait Store: Send + Sync {
    /// Fetch a term document by id, fused with its outgoing enumeration
    /// edges. A zero-row result is `Ok(None)`.
    fn fetch_term(
        &self,
        id: &str,
        deadline: Option<Instant>,
    ) -> Result<Option<FetchedTerm>, StoreError>;

    /// Search terms whose code-section `field` equals `value`, restricted
    /// to terms on an enumeration path containing `enum_type`. Returns the
    /// matching source term ids.
    fn query_by_code(
        &self,
        field: &str,
        value: &Value,
        enum_type: &str,
        deadline: Option<Instant>,
    ) -> Result<Vec<String>, StoreError>;

    fn document_exists(
        &self,
        collection: &str,
        key: &str,
        deadline: Option<Instant>,
    ) -> Result<bool, StoreError>;

    fn collection_exists(&self, name: &str, deadline: Option<Instant>)
        -> Result<bool, StoreError>;
}

lazy_static! {
    // A collection name is a letter followed by up to 255 letters, digits,
    // underscores, or dashes.
    static ref COLLECTION_NAME_RE: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9_\-]{0,255}\z").expect("is a valid regex");
    // A document key is 1 to 254 characters of the document-key alphabet.
    static ref KEY_VALUE_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9_\-:.@()+,=;$!*'%]{1,254}\z").expect("is a valid regex");
}

/// Grammar check for collection names. Pure; no I/O.
pub fn is_valid_collection_name(name: &str) -> bool {
    COLLECTION_NAME_RE.is_match(name)
}

/// Grammar check for document keys and term identifiers. Pure; no I/O.
pub fn is_valid_key_value(key: &str) -> bool {
    KEY_VALUE_RE.is_match(key)
}

#[cfg(test)]
mod test {
    use super::{is_valid_collection_name, is_valid_key_value};

    #[test]
    fn test_collection_name_grammar() {
        for (name, expect) in [
            ("terms", true),
            ("Terms_2024", true),
            ("t", true),
            ("a-b-c", true),
            ("", false),
            ("_terms", false),
            ("9terms", false),
            ("ter ms", false),
            ("terms/edges", false),
        ] {
            assert_eq!(is_valid_collection_name(name), expect, "name: {name:?}");
        }
    }

    #[test]
    fn test_key_value_grammar() {
        for (key, expect) in [
            ("color_red", true),
            ("iso_639_3_eng", true),
            ("a:b", true),
            ("K-1.2@x", true),
            ("(ok)", true),
            ("", false),
            ("has space", false),
            ("slash/key", false),
            ("tab\tkey", false),
        ] {
            assert_eq!(is_valid_key_value(key), expect, "key: {key:?}");
        }

        assert!(is_valid_key_value(&"x".repeat(254)));
        assert!(!is_valid_key_value(&"x".repeat(255)));
    }
}
