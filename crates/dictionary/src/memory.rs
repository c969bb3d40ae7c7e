use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;

use crate::{Config, FetchedTerm, Store, StoreError};

/// MemoryStore is an in-process Store for tests and embedders. Terms are
/// held as documents with an optional code section, enumeration membership
/// as explicit edge triples, and a per-id fetch counter lets callers
/// observe read-through behavior.
pub struct MemoryStore {
    enum_predicate: String,
    terms: BTreeMap<String, TermDoc>,
    edges: Vec<Edge>,
    collections: BTreeMap<String, BTreeSet<String>>,
    fetched: Mutex<BTreeMap<String, u64>>,
}

struct TermDoc {
    data: Option<Value>,
    rule: Option<Value>,
    code: Option<Value>,
}

struct Edge {
    from: String,
    predicate: String,
    path: Vec<String>,
}

impl MemoryStore {
    pub fn new(config: &Config) -> Self {
        Self {
            enum_predicate: config.predicate_enum.clone(),
            terms: BTreeMap::new(),
            edges: Vec::new(),
            collections: BTreeMap::new(),
            fetched: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a term document. `code` is the stored code section, which
    /// only the search view consults; the projection never sees it.
    pub fn insert_term(
        &mut self,
        key: &str,
        data: Option<Value>,
        rule: Option<Value>,
        code: Option<Value>,
    ) {
        self.terms
            .insert(key.to_string(), TermDoc { data, rule, code });
    }

    /// Register an edge leaving `from` whose path lists type-term keys.
    pub fn insert_edge(&mut self, from: &str, predicate: &str, path: &[&str]) {
        self.edges.push(Edge {
            from: from.to_string(),
            predicate: predicate.to_string(),
            path: path.iter().map(|s| s.to_string()).collect(),
        });
    }

    pub fn insert_collection(&mut self, name: &str) {
        self.collections.entry(name.to_string()).or_default();
    }

    pub fn insert_document(&mut self, collection: &str, key: &str) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// How many times `fetch_term` reached this id.
    pub fn fetches(&self, id: &str) -> u64 {
        self.fetched
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    fn has_enum_edge(&self, from: &str, enum_type: &str) -> bool {
        self.edges.iter().any(|e| {
            e.from == from && e.predicate == self.enum_predicate && e.path.iter().any(|t| t == enum_type)
        })
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<(), StoreError> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(StoreError::Timeout),
        _ => Ok(()),
    }
}

impl Store for MemoryStore {
    fn fetch_term(
        &self,
        id: &str,
        deadline: Option<Instant>,
    ) -> Result<Option<FetchedTerm>, StoreError> {
        check_deadline(deadline)?;
        *self
            .fetched
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert(0) += 1;

        let Some(doc) = self.terms.get(id) else {
            return Ok(None);
        };
        let edge_paths = self
            .edges
            .iter()
            .filter(|e| e.from == id && e.predicate == self.enum_predicate)
            .flat_map(|e| e.path.iter().cloned())
            .collect();

        Ok(Some(FetchedTerm {
            key: id.to_string(),
            data: doc.data.clone(),
            rule: doc.rule.clone(),
            edge_paths,
        }))
    }

    fn query_by_code(
        &self,
        field: &str,
        value: &Value,
        enum_type: &str,
        deadline: Option<Instant>,
    ) -> Result<Vec<String>, StoreError> {
        check_deadline(deadline)?;

        let ids = self
            .terms
            .iter()
            .filter(|(key, doc)| {
                doc.code
                    .as_ref()
                    .and_then(|code| code.get(field))
                    .map_or(false, |v| v == value)
                    && self.has_enum_edge(key, enum_type)
            })
            .map(|(key, _)| key.clone())
            .collect();
        Ok(ids)
    }

    fn document_exists(
        &self,
        collection: &str,
        key: &str,
        deadline: Option<Instant>,
    ) -> Result<bool, StoreError> {
        check_deadline(deadline)?;
        Ok(self
            .collections
            .get(collection)
            .map_or(false, |docs| docs.contains(key)))
    }

    fn collection_exists(
        &self,
        name: &str,
        deadline: Option<Instant>,
    ) -> Result<bool, StoreError> {
        check_deadline(deadline)?;
        Ok(self.collections.contains_key(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn fixture() -> MemoryStore {
        let config = Config::default();
        let mut store = MemoryStore::new(&config);
        store.insert_term("unit_celsius", None, None, Some(json!({"_lid": "C"})));
        store.insert_edge("unit_celsius", "_predicate_enum-of", &["TYPE_UNIT"]);
        store.insert_edge("unit_celsius", "_other_predicate", &["TYPE_IGNORED"]);
        store.insert_document("observations", "obs-1");
        store
    }

    #[test]
    fn test_fetch_fuses_enum_edges() {
        let store = fixture();
        let fetched = store.fetch_term("unit_celsius", None).unwrap().unwrap();
        // Only edges carrying the enumeration predicate contribute.
        assert_eq!(fetched.edge_paths, vec!["TYPE_UNIT".to_string()]);
        assert_eq!(store.fetches("unit_celsius"), 1);
    }

    #[test]
    fn test_query_by_code() {
        let store = fixture();
        let ids = store
            .query_by_code("_lid", &json!("C"), "TYPE_UNIT", None)
            .unwrap();
        assert_eq!(ids, vec!["unit_celsius".to_string()]);

        // Wrong enumeration type, wrong field, wrong value: all empty.
        for (field, value, enum_type) in [
            ("_lid", json!("C"), "TYPE_COLOR"),
            ("_aid", json!("C"), "TYPE_UNIT"),
            ("_lid", json!("F"), "TYPE_UNIT"),
        ] {
            assert!(store
                .query_by_code(field, &value, enum_type, None)
                .unwrap()
                .is_empty());
        }
    }

    #[test]
    fn test_existence_probes() {
        let store = fixture();
        assert!(store.collection_exists("observations", None).unwrap());
        assert!(!store.collection_exists("missing", None).unwrap());
        assert!(store.document_exists("observations", "obs-1", None).unwrap());
        assert!(!store.document_exists("observations", "obs-2", None).unwrap());
    }

    #[test]
    fn test_expired_deadline() {
        let store = fixture();
        let expired = Instant::now();
        std::thread::sleep(Duration::from_millis(1));
        assert!(matches!(
            store.fetch_term("unit_celsius", Some(expired)),
            Err(StoreError::Timeout)
        ));
    }
}
