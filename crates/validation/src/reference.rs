use dictionary::{is_valid_collection_name, is_valid_key_value, Config, Store, Term};
use serde_json::Value;
use tracing::debug;

use crate::section::ScalarSection;
use crate::{Code, Extras, Validator, Walk};

/// Verdict of one kind-qualifier option against a resolved term.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum KindVerdict {
    Satisfied,
    Failed(Code),
    Defect,
}

impl<S: Store> Validator<S> {
    /// A key value references a term: reserved-key and grammar checks,
    /// resolution through the cache, then the kind qualifier, of which at
    /// least one option must be satisfied.
    pub(crate) fn check_key(
        &mut self,
        value: &Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> Walk {
        let Some(text) = value.as_str() else {
            return Ok(self.fail(
                idx,
                Code::NotAString,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        };

        if text.is_empty() {
            // Only the namespace descriptor may hold an empty reference,
            // and only when defaulting the namespace was requested.
            let tolerated =
                self.def_namespace && descriptor == self.cache.config().namespace_identifier;
            if tolerated {
                return Ok(true);
            }
            return Ok(self.fail(
                idx,
                Code::EmptyKey,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }
        if text == self.cache.config().default_namespace_key {
            return Ok(self.fail(
                idx,
                Code::NoRefDefaultNamespaceKey,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }
        if !is_valid_key_value(text) {
            return Ok(self.fail(
                idx,
                Code::BadKeyValue,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }

        self.check_cancel()?;
        let Some(term) = self
            .cache
            .get_term(text, self.use_cache, true, self.cache_missing)?
        else {
            return Ok(self.fail(
                idx,
                Code::ValueNotTerm,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        };

        match scalar.kind {
            Some(kind) => Ok(self.check_kinds(&term, kind, value, descriptor, idx)),
            None => Ok(true),
        }
    }

    fn check_kinds(
        &mut self,
        term: &Term,
        kind: &Value,
        value: &Value,
        descriptor: &str,
        idx: Option<usize>,
    ) -> bool {
        let Some(kinds) = kind.as_array() else {
            return self.fail(
                idx,
                Code::NotArrayDataKind,
                descriptor,
                Some(value.clone()),
                Extras {
                    section: Some(kind.clone()),
                    ..Extras::default()
                },
            );
        };

        // An empty list can satisfy nothing: degenerate kind qualifier.
        let mut last_failure = Code::NotArrayDataKind;
        for option in kinds {
            match kind_verdict(option, term, self.cache.config()) {
                KindVerdict::Satisfied => return true,
                KindVerdict::Failed(code) => last_failure = code,
                KindVerdict::Defect => {
                    return self.fail(
                        idx,
                        Code::InvalidDataKindOption,
                        descriptor,
                        Some(value.clone()),
                        Extras {
                            section: Some(kind.clone()),
                            ..Extras::default()
                        },
                    )
                }
            }
        }
        self.fail(
            idx,
            last_failure,
            descriptor,
            Some(value.clone()),
            Extras::default(),
        )
    }

    /// A handle value addresses a document as `collection/key`.
    pub(crate) fn check_handle(
        &mut self,
        value: &Value,
        descriptor: &str,
        idx: Option<usize>,
    ) -> Walk {
        let Some(text) = value.as_str() else {
            return Ok(self.fail(
                idx,
                Code::NotAString,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        };
        let Some((collection, doc_key)) = text.split_once('/') else {
            return Ok(self.fail(
                idx,
                Code::BadHandleValue,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        };

        if !is_valid_collection_name(collection) {
            return Ok(self.fail(
                idx,
                Code::BadCollectionName,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }
        self.check_cancel()?;
        if !self.cache.collection_exists(collection)? {
            return Ok(self.fail(
                idx,
                Code::UnknownCollection,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }
        if !is_valid_key_value(doc_key) {
            return Ok(self.fail(
                idx,
                Code::BadKeyValue,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }
        self.check_cancel()?;
        if !self.cache.document_exists(collection, doc_key)? {
            return Ok(self.fail(
                idx,
                Code::UnknownDocument,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }
        Ok(true)
    }

    /// An enum value references an enumeration element of one of the
    /// types listed by the kind qualifier. An unresolved value may fall
    /// back, under `resolve`, to the code-section search: the first type
    /// producing a unique match rewrites the value to the matched id.
    pub(crate) fn check_enum(
        &mut self,
        value: &mut Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> Walk {
        let text = match value.as_str() {
            Some(text) => text.to_string(),
            None => {
                return Ok(self.fail(
                    idx,
                    Code::NotAString,
                    descriptor,
                    Some(value.clone()),
                    Extras::default(),
                ))
            }
        };
        if !is_valid_key_value(&text) {
            return Ok(self.fail(
                idx,
                Code::BadKeyValue,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }

        // The enumeration types to check against come from the kind list.
        let Some(kind) = scalar.kind else {
            return Ok(self.fail(
                idx,
                Code::NotArrayDataKind,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        };
        let Some(kinds) = kind.as_array() else {
            return Ok(self.fail(
                idx,
                Code::NotArrayDataKind,
                descriptor,
                Some(value.clone()),
                Extras {
                    section: Some(kind.clone()),
                    ..Extras::default()
                },
            ));
        };

        self.check_cancel()?;
        match self
            .cache
            .get_term(&text, self.use_cache, true, self.cache_missing)?
        {
            Some(term) => {
                if !term.is_enumeration() {
                    return Ok(self.fail(
                        idx,
                        Code::NotAnEnum,
                        descriptor,
                        Some(value.clone()),
                        Extras::default(),
                    ));
                }

                let config = self.cache.config();
                let mut accepted = false;
                let mut defect = false;
                for option in kinds {
                    match option.as_str() {
                        None => {
                            defect = true;
                            break;
                        }
                        Some(option) if option == config.any_enum => {
                            accepted = true;
                            break;
                        }
                        Some(option) if term.in_enumeration(option) => {
                            accepted = true;
                            break;
                        }
                        Some(_) => (),
                    }
                }

                if defect {
                    return Ok(self.fail(
                        idx,
                        Code::InvalidDataKindOption,
                        descriptor,
                        Some(value.clone()),
                        Extras {
                            section: Some(kind.clone()),
                            ..Extras::default()
                        },
                    ));
                }
                if accepted {
                    Ok(true)
                } else {
                    Ok(self.fail(
                        idx,
                        Code::NotCorrectEnumType,
                        descriptor,
                        Some(value.clone()),
                        Extras::default(),
                    ))
                }
            }
            None => {
                if self.resolve {
                    let wildcards = {
                        let config = self.cache.config();
                        [
                            config.any_term.clone(),
                            config.any_enum.clone(),
                            config.any_descriptor.clone(),
                            config.any_object.clone(),
                        ]
                    };

                    for option in kinds {
                        let Some(enum_type) = option.as_str() else {
                            return Ok(self.fail(
                                idx,
                                Code::InvalidDataKindOption,
                                descriptor,
                                Some(value.clone()),
                                Extras {
                                    section: Some(kind.clone()),
                                    ..Extras::default()
                                },
                            ));
                        };
                        // Wildcards name no enumeration and cannot drive
                        // the code search.
                        if wildcards.iter().any(|w| w == enum_type) {
                            continue;
                        }

                        self.check_cancel()?;
                        let ids = self.cache.query_enum_identifier_by_code(
                            &self.resolver,
                            &Value::String(text.clone()),
                            enum_type,
                        )?;
                        // Only a unique match resolves; zero or several
                        // candidates move on to the next type.
                        if let [id] = ids.as_slice() {
                            let original = Value::String(text.clone());
                            *value = Value::String(id.clone());
                            self.report
                                .log_resolution(idx, descriptor, original, value.clone());
                            debug!(descriptor, code = %text, id = %id, "resolved enumeration code");
                            return Ok(true);
                        }
                    }
                }

                Ok(self.fail(
                    idx,
                    Code::ValueNotTerm,
                    descriptor,
                    Some(value.clone()),
                    Extras::default(),
                ))
            }
        }
    }
}

/// Evaluate one kind option: a wildcard, an explicit enumeration-type
/// key, or a defect.
fn kind_verdict(option: &Value, term: &Term, config: &Config) -> KindVerdict {
    let Some(option) = option.as_str() else {
        return KindVerdict::Defect;
    };

    if option == config.any_term {
        KindVerdict::Satisfied
    } else if option == config.any_enum {
        if term.is_enumeration() {
            KindVerdict::Satisfied
        } else {
            KindVerdict::Failed(Code::NotAnEnum)
        }
    } else if option == config.any_descriptor {
        if term.is_descriptor() {
            KindVerdict::Satisfied
        } else {
            KindVerdict::Failed(Code::NotADescriptor)
        }
    } else if option == config.any_object {
        if term.is_structure() {
            KindVerdict::Satisfied
        } else {
            KindVerdict::Failed(Code::NotAStructureDefinition)
        }
    } else if is_valid_key_value(option) {
        // An explicit enumeration-type term key.
        if term.in_enumeration(option) {
            KindVerdict::Satisfied
        } else if !term.is_enumeration() {
            KindVerdict::Failed(Code::NotAnEnum)
        } else {
            KindVerdict::Failed(Code::NotCorrectEnumType)
        }
    } else {
        KindVerdict::Defect
    }
}

#[cfg(test)]
mod test {
    use super::{kind_verdict, KindVerdict};
    use crate::Code;
    use dictionary::{Config, Term};
    use serde_json::json;

    fn term(data: bool, rule: bool, path: &[&str]) -> Term {
        Term {
            key: "t".to_string(),
            data: data.then(|| json!({"_scalar": {}})),
            rule: rule.then(|| json!({})),
            path: (!path.is_empty()).then(|| path.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_kind_verdicts() {
        let config = Config::default();

        let plain = term(false, false, &[]);
        let descriptor = term(true, false, &[]);
        let structure = term(false, true, &[]);
        let color = term(false, false, &["TYPE_COLOR"]);

        for (option, subject, expect) in [
            (json!("_any-term"), &plain, KindVerdict::Satisfied),
            (json!("_any-enum"), &color, KindVerdict::Satisfied),
            (
                json!("_any-enum"),
                &plain,
                KindVerdict::Failed(Code::NotAnEnum),
            ),
            (json!("_any-descriptor"), &descriptor, KindVerdict::Satisfied),
            (
                json!("_any-descriptor"),
                &plain,
                KindVerdict::Failed(Code::NotADescriptor),
            ),
            (json!("_any-object"), &structure, KindVerdict::Satisfied),
            (
                json!("_any-object"),
                &plain,
                KindVerdict::Failed(Code::NotAStructureDefinition),
            ),
            (json!("TYPE_COLOR"), &color, KindVerdict::Satisfied),
            (
                json!("TYPE_SHAPE"),
                &color,
                KindVerdict::Failed(Code::NotCorrectEnumType),
            ),
            (
                json!("TYPE_COLOR"),
                &plain,
                KindVerdict::Failed(Code::NotAnEnum),
            ),
            (json!(7), &plain, KindVerdict::Defect),
            (json!("has space"), &plain, KindVerdict::Defect),
        ] {
            assert_eq!(
                kind_verdict(&option, subject, &config),
                expect,
                "option: {option}"
            );
        }
    }
}
