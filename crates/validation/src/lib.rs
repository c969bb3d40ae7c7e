pub mod number;
pub mod report;
pub mod section;

mod reference;
mod scalar;
mod walk;

pub use number::Number;
pub use report::{change_key, Change, Code, Extras, Report, Slot, Status};
pub use section::{Dimension, ScalarType};

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dictionary::{Store, StoreError, TermCache};
use serde_json::Value;
use tracing::debug;

/// CancelToken is a shared cancellation signal between a validator and its
/// controller. The validator checks it at every dimension boundary and
/// before every store call.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options are the construction parameters of a Validator.
pub struct Options {
    /// The value under validation. Required.
    pub value: Value,
    /// Descriptor term key the value is validated against. When absent,
    /// the value must be an object or an array of objects whose property
    /// names name their own descriptors.
    pub descriptor: Option<String>,
    /// Validate each element of an array value against the descriptor,
    /// producing one report slot per element.
    pub zip: bool,
    /// Consult the process-wide term cache.
    pub use_cache: bool,
    /// Mark store misses in the cache so they are not retried.
    pub cache_missing: bool,
    /// In object mode, report properties that do not resolve to a term.
    pub expect_terms: bool,
    /// Report scalar sections that declare no data type.
    pub expect_type: bool,
    /// Allow value resolution: timestamp strings and enumeration codes are
    /// rewritten to canonical form, logged on the slot.
    pub resolve: bool,
    /// Tolerate an empty key value for the namespace descriptor.
    pub def_namespace: bool,
    /// Code-section field probed during enumeration resolution. Defaults
    /// to the configured local-identifier field.
    pub resolver: Option<String>,
    /// Deadline passed to every store call.
    pub deadline: Option<Instant>,
    /// Shared cancellation signal.
    pub cancel: CancelToken,
}

impl Options {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            descriptor: None,
            zip: false,
            use_cache: true,
            cache_missing: false,
            expect_terms: false,
            expect_type: false,
            resolve: false,
            def_namespace: false,
            resolver: None,
            deadline: None,
            cancel: CancelToken::new(),
        }
    }
}

/// BuildError rejects inconsistent constructor arguments. These are
/// programmer errors, not validation findings.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("a value to validate is required")]
    MissingValue,
    #[error("zipped validation requires a descriptor")]
    ZipWithoutDescriptor,
    #[error("zipped validation requires an array value")]
    ZipValueNotArray,
    #[error("validation without a descriptor requires an object or an array of objects")]
    ValueNotObjectLike,
}

/// Interrupt aborts the traversal: cancellation returns the report as-is,
/// a store failure is fatal to the whole validate call.
pub(crate) enum Interrupt {
    Cancelled,
    Store(StoreError),
}

impl From<StoreError> for Interrupt {
    fn from(error: StoreError) -> Self {
        Interrupt::Store(error)
    }
}

pub(crate) type Walk = Result<bool, Interrupt>;

/// Validator checks one value against the data dictionary. An instance is
/// single-use state for one logical input and is not thread-safe; distinct
/// instances run concurrently and share the process-wide term cache.
pub struct Validator<S: Store> {
    pub(crate) cache: TermCache<S>,
    value: Value,
    descriptor: Option<String>,
    zip: bool,
    pub(crate) use_cache: bool,
    pub(crate) cache_missing: bool,
    expect_terms: bool,
    pub(crate) expect_type: bool,
    pub(crate) resolve: bool,
    pub(crate) def_namespace: bool,
    pub(crate) resolver: String,
    cancel: CancelToken,
    language: String,
    open_slot: Option<usize>,
    pub(crate) report: Report,
}

impl<S: Store> Validator<S> {
    pub fn new(cache: TermCache<S>, options: Options) -> Result<Self, BuildError> {
        let Options {
            value,
            descriptor,
            zip,
            use_cache,
            cache_missing,
            expect_terms,
            expect_type,
            resolve,
            def_namespace,
            resolver,
            deadline,
            cancel,
        } = options;

        if value.is_null() {
            return Err(BuildError::MissingValue);
        }
        if zip && descriptor.is_none() {
            return Err(BuildError::ZipWithoutDescriptor);
        }
        if zip && !value.is_array() {
            return Err(BuildError::ZipValueNotArray);
        }
        if descriptor.is_none() && !value.is_object() && !value.is_array() {
            return Err(BuildError::ValueNotObjectLike);
        }

        let config = cache.config();
        let resolver = resolver.unwrap_or_else(|| config.local_identifier.clone());
        let language = config.default_language.clone();
        let cache = cache.with_deadline(deadline);

        let report = Report::Single(Slot::idle(
            Status::new(Code::Ok, &language, &language),
            String::new(),
        ));

        Ok(Self {
            cache,
            value,
            descriptor,
            zip,
            use_cache,
            cache_missing,
            expect_terms,
            expect_type,
            resolve,
            def_namespace,
            resolver,
            cancel,
            language,
            open_slot: None,
            report,
        })
    }

    /// Run validation. Ok(true) iff every report slot is idle. Store
    /// failures are fatal: the open slot records the condition and the
    /// error is returned.
    pub fn validate(&mut self, language: Option<&str>) -> Result<bool, StoreError> {
        if let Some(language) = language {
            self.language = language.to_string();
        }

        match self.run() {
            Ok(()) => Ok(self.report.ok()),
            Err(Interrupt::Cancelled) => {
                debug!("validation cancelled");
                let idx = self.open_slot;
                self.fail(idx, Code::Cancelled, "", None, Extras::default());
                Ok(false)
            }
            Err(Interrupt::Store(error)) => {
                let idx = self.open_slot;
                self.fail(idx, Code::StoreError, "", None, Extras::default());
                Err(error)
            }
        }
    }

    /// The structured report of the last validate call.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// The value under validation, as possibly rewritten by resolution.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    fn run(&mut self) -> Result<(), Interrupt> {
        if let Some(key) = self.descriptor.clone() {
            self.check_cancel()?;
            let Some(term) = self
                .cache
                .get_term(&key, self.use_cache, true, self.cache_missing)?
            else {
                self.fail(None, Code::UnknownDescriptor, &key, None, Extras::default());
                return Ok(());
            };
            let Some(data) = term.data.as_ref() else {
                self.fail(None, Code::NotADescriptor, &key, None, Extras::default());
                return Ok(());
            };
            if self.zip {
                self.run_zipped(&key, data)
            } else {
                self.run_single(&key, data)
            }
        } else if self.value.is_object() {
            self.run_object()
        } else {
            self.run_bag()
        }
    }

    /// Descriptor and value: one slot, one walk.
    fn run_single(&mut self, descriptor: &str, data: &Value) -> Result<(), Interrupt> {
        self.report = Report::Single(self.idle_slot(descriptor));
        self.open_slot = None;

        let mut value = mem::take(&mut self.value);
        let walked = self.walk(&mut value, descriptor, data, None);
        self.value = value;
        walked.map(|_| ())
    }

    /// Zipped mode: every element of the array is validated against the
    /// descriptor, into its own slot. Slots are independent.
    fn run_zipped(&mut self, descriptor: &str, data: &Value) -> Result<(), Interrupt> {
        let mut value = mem::take(&mut self.value);
        let len = value.as_array().map_or(0, Vec::len);
        self.report = Report::Indexed((0..len).map(|_| self.idle_slot(descriptor)).collect());

        let mut outcome = Ok(());
        if let Some(items) = value.as_array_mut() {
            for (i, item) in items.iter_mut().enumerate() {
                self.open_slot = Some(i);
                if let Err(interrupt) = self.walk(item, descriptor, data, Some(i)) {
                    outcome = Err(interrupt);
                    break;
                }
            }
        }
        if outcome.is_ok() {
            self.open_slot = None;
        }
        self.value = value;
        outcome
    }

    /// Object mode: one slot; each property resolves its own descriptor.
    fn run_object(&mut self) -> Result<(), Interrupt> {
        self.report = Report::Single(self.idle_slot(""));
        self.open_slot = None;

        let mut value = mem::take(&mut self.value);
        let outcome = self.validate_object(&mut value, None);
        self.value = value;
        outcome
    }

    /// Bag mode: an array of objects, one slot per element.
    fn run_bag(&mut self) -> Result<(), Interrupt> {
        let mut value = mem::take(&mut self.value);
        let len = value.as_array().map_or(0, Vec::len);
        self.report = Report::Indexed((0..len).map(|_| self.idle_slot("")).collect());

        let mut outcome = Ok(());
        if let Some(items) = value.as_array_mut() {
            for (i, item) in items.iter_mut().enumerate() {
                self.open_slot = Some(i);
                if !item.is_object() {
                    self.fail(
                        Some(i),
                        Code::NotAnObject,
                        "",
                        Some(item.clone()),
                        Extras::default(),
                    );
                    continue;
                }
                if let Err(interrupt) = self.validate_object(item, Some(i)) {
                    outcome = Err(interrupt);
                    break;
                }
            }
        }
        if outcome.is_ok() {
            self.open_slot = None;
        }
        self.value = value;
        outcome
    }

    /// Validate one object into one slot: resolve each property name as a
    /// term and walk its data section. The first error ends the slot.
    fn validate_object(&mut self, value: &mut Value, idx: Option<usize>) -> Result<(), Interrupt> {
        let keys: Vec<String> = value
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();

        if keys.is_empty() {
            self.fail(idx, Code::EmptyObject, "", Some(value.clone()), Extras::default());
            return Ok(());
        }

        for key in keys {
            self.check_cancel()?;
            let Some(term) = self
                .cache
                .get_term(&key, self.use_cache, true, self.cache_missing)?
            else {
                if self.expect_terms {
                    let offending = value.get(&key).cloned();
                    self.fail(idx, Code::UnknownDescriptor, &key, offending, Extras::default());
                    return Ok(());
                }
                debug!(key = %key, "property is not a term, skipping");
                continue;
            };
            let Some(data) = term.data.as_ref() else {
                self.fail(
                    idx,
                    Code::NotADescriptor,
                    &key,
                    value.get(&key).cloned(),
                    Extras::default(),
                );
                return Ok(());
            };
            let Some(item) = value.get_mut(&key) else {
                continue;
            };
            if !self.walk(item, &key, data, idx)? {
                return Ok(());
            }
        }
        Ok(())
    }

    pub(crate) fn idle_slot(&self, descriptor: &str) -> Slot {
        Slot::idle(self.status(Code::Ok), descriptor.to_string())
    }

    pub(crate) fn status(&self, code: Code) -> Status {
        Status::new(code, &self.language, &self.cache.config().default_language)
    }

    /// Write a status into the slot at `idx`; true iff the slot stays idle.
    pub(crate) fn fail(
        &mut self,
        idx: Option<usize>,
        code: Code,
        descriptor: &str,
        value: Option<Value>,
        extras: Extras,
    ) -> bool {
        let status = self.status(code);
        self.report.set_status(idx, status, descriptor, value, extras)
    }

    pub(crate) fn check_cancel(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            Err(Interrupt::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dictionary::{Config, MemoryStore};
    use serde_json::json;

    fn cache() -> TermCache<MemoryStore> {
        let config = Arc::new(Config::default());
        let store = MemoryStore::new(&config);
        TermCache::new(Arc::new(store), config)
    }

    #[test]
    fn test_construction_contract() {
        assert!(matches!(
            Validator::new(cache(), Options::new(json!(null))),
            Err(BuildError::MissingValue)
        ));

        assert!(matches!(
            Validator::new(
                cache(),
                Options {
                    zip: true,
                    ..Options::new(json!([1, 2]))
                }
            ),
            Err(BuildError::ZipWithoutDescriptor)
        ));

        assert!(matches!(
            Validator::new(
                cache(),
                Options {
                    zip: true,
                    descriptor: Some("D".to_string()),
                    ..Options::new(json!(1))
                }
            ),
            Err(BuildError::ZipValueNotArray)
        ));

        assert!(matches!(
            Validator::new(cache(), Options::new(json!(42))),
            Err(BuildError::ValueNotObjectLike)
        ));

        // Well-formed combinations construct.
        assert!(Validator::new(cache(), Options::new(json!({"a": 1}))).is_ok());
        assert!(Validator::new(
            cache(),
            Options {
                descriptor: Some("D".to_string()),
                ..Options::new(json!(42))
            }
        )
        .is_ok());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
