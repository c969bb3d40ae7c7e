use std::sync::{Arc, RwLock};
use std::time::Instant;

use fxhash::FxHashMap;
use itertools::Itertools;
use lazy_static::lazy_static;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Config, FetchedTerm, Store, StoreError, Term};

/// Cached is one entry of the process-wide term map: a projected term, or
/// the absent marker that suppresses repeat lookups of a missing id.
#[derive(Debug, Clone)]
enum Cached {
    Found(Arc<Term>),
    Absent,
}

lazy_static! {
    // The dictionary is small and rarely changing: no eviction, reads in
    // parallel, a write only to fill or to mark an id absent.
    static ref GLOBAL: RwLock<FxHashMap<String, Cached>> = RwLock::new(FxHashMap::default());
}

/// Drop every globally cached term and absent marker. Test hook; there is
/// no eviction path.
pub fn reset() {
    GLOBAL.write().unwrap().clear();
}

/// TermCache resolves term ids to their projected representation, reading
/// through the process-wide map and an instance-local staged overlay to
/// the store. The overlay belongs to a single validator instance; the
/// global map is shared by every validator in the process.
pub struct TermCache<S: Store> {
    store: Arc<S>,
    config: Arc<Config>,
    batch: FxHashMap<String, Arc<Term>>,
    deadline: Option<Instant>,
}

impl<S: Store> TermCache<S> {
    pub fn new(store: Arc<S>, config: Arc<Config>) -> Self {
        Self {
            store,
            config,
            batch: FxHashMap::default(),
            deadline: None,
        }
    }

    /// Bound every store call issued through this cache instance.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stage a term that is not yet persisted. Staged terms are consulted
    /// only when a lookup asks for the batch overlay.
    pub fn stage(&mut self, term: Term) {
        self.batch.insert(term.key.clone(), Arc::new(term));
    }

    /// Resolve a term id to its projection. Lookup order: global map (if
    /// `use_cache`), staged overlay (if `use_batch`), store. A store hit is
    /// projected and cached; a store miss is marked absent only when
    /// `cache_missing && use_cache`. A store failure leaves the maps
    /// untouched.
    pub fn get_term(
        &self,
        id: &str,
        use_cache: bool,
        use_batch: bool,
        cache_missing: bool,
    ) -> Result<Option<Arc<Term>>, StoreError> {
        if use_cache {
            if let Some(cached) = GLOBAL.read().unwrap().get(id) {
                return match cached {
                    Cached::Found(term) => {
                        debug!(id, "term cache hit");
                        Ok(Some(term.clone()))
                    }
                    Cached::Absent => {
                        debug!(id, "term cache absent marker");
                        Ok(None)
                    }
                };
            }
        }
        if use_batch {
            if let Some(term) = self.batch.get(id) {
                debug!(id, "staged overlay hit");
                return Ok(Some(term.clone()));
            }
        }

        match self.store.fetch_term(id, self.deadline)? {
            Some(fetched) => {
                let term = Arc::new(project(fetched));
                debug!(id, "projected term from store");
                GLOBAL
                    .write()
                    .unwrap()
                    .insert(id.to_string(), Cached::Found(term.clone()));
                Ok(Some(term))
            }
            None => {
                debug!(id, "term not in store");
                if cache_missing && use_cache {
                    GLOBAL
                        .write()
                        .unwrap()
                        .insert(id.to_string(), Cached::Absent);
                }
                Ok(None)
            }
        }
    }

    /// Batched `get_term`: first-occurrence order, duplicate ids collapsed.
    pub fn get_terms(
        &self,
        ids: &[String],
        use_cache: bool,
        use_batch: bool,
        cache_missing: bool,
    ) -> Result<Vec<(String, Option<Arc<Term>>)>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids.iter().unique() {
            let term = self.get_term(id, use_cache, use_batch, cache_missing)?;
            out.push((id.clone(), term));
        }
        Ok(out)
    }

    /// Search term ids whose code-section `field` equals `value` within the
    /// enumeration `enum_type`. Never consults the cache: the projection
    /// does not carry the code section. More than one candidate means the
    /// enumeration graph is ambiguous for this code; the caller decides.
    pub fn query_enum_identifier_by_code(
        &self,
        field: &str,
        value: &Value,
        enum_type: &str,
    ) -> Result<Vec<String>, StoreError> {
        let ids = self
            .store
            .query_by_code(field, value, enum_type, self.deadline)?;
        if ids.len() > 1 {
            warn!(
                field,
                enum_type,
                candidates = ids.len(),
                "ambiguous enumeration code"
            );
        }
        Ok(ids)
    }

    pub fn document_exists(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        self.store.document_exists(collection, key, self.deadline)
    }

    pub fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.store.collection_exists(name, self.deadline)
    }
}

/// Project a fetched term: retain key, data, and rule; merge the edge
/// paths, deduplicated in first-seen order, attached only when non-empty.
fn project(fetched: FetchedTerm) -> Term {
    let FetchedTerm {
        key,
        data,
        rule,
        edge_paths,
    } = fetched;

    let path: Vec<String> = edge_paths.into_iter().unique().collect();
    Term {
        key,
        data,
        rule,
        path: (!path.is_empty()).then(|| path),
    }
}
