use serde_json::Value;
use tracing::trace;

use crate::section::{DictSection, Dimension, ScalarSection, SeqSection};
use crate::{Code, Extras, ScalarType, Validator, Walk};
use dictionary::Store;

impl<S: Store> Validator<S> {
    /// Interpret one level of a data section against `value`. The section
    /// must carry exactly one dimension tag; dispatch recurses through
    /// containers down to the scalar leaf. Returns Ok(false) as soon as a
    /// finding is written: the first error wins within a slot.
    pub(crate) fn walk(
        &mut self,
        value: &mut Value,
        descriptor: &str,
        section: &Value,
        idx: Option<usize>,
    ) -> Walk {
        self.check_cancel()?;

        let Some(dimension) = Dimension::parse(section, self.cache.config()) else {
            return Ok(self.fail(
                idx,
                Code::ExpectingDataDimension,
                descriptor,
                Some(value.clone()),
                Extras {
                    section: Some(section.clone()),
                    ..Extras::default()
                },
            ));
        };

        match dimension {
            Dimension::Scalar(scalar) => self.walk_scalar(value, descriptor, &scalar, idx),
            Dimension::Array(seq) => self.walk_sequence(value, descriptor, &seq, false, idx),
            Dimension::Set(seq) => self.walk_sequence(value, descriptor, &seq, true, idx),
            Dimension::Dict(dict) => self.walk_dict(value, descriptor, &dict, idx),
        }
    }

    fn walk_scalar(
        &mut self,
        value: &mut Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> Walk {
        if value.is_array() {
            return Ok(self.fail(
                idx,
                Code::NotAScalar,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }

        let Some(tag) = scalar.data_type else {
            if self.expect_type {
                return Ok(self.fail(
                    idx,
                    Code::MissingScalarDataType,
                    descriptor,
                    Some(value.clone()),
                    Extras::default(),
                ));
            }
            return Ok(true);
        };

        let scalar_type = tag
            .as_str()
            .and_then(|tag| ScalarType::from_tag(tag, self.cache.config()));
        let Some(scalar_type) = scalar_type else {
            return Ok(self.fail(
                idx,
                Code::Unsupported,
                descriptor,
                Some(value.clone()),
                Extras {
                    section: Some(tag.clone()),
                    ..Extras::default()
                },
            ));
        };
        trace!(descriptor, ?scalar_type, "scalar dispatch");

        match scalar_type {
            ScalarType::Boolean => Ok(self.check_boolean(value, descriptor, idx)),
            ScalarType::Integer => Ok(self.check_integer(value, descriptor, scalar, idx)),
            ScalarType::Number => Ok(self.check_number(value, descriptor, scalar, idx)),
            ScalarType::Timestamp => Ok(self.check_timestamp(value, descriptor, scalar, idx)),
            ScalarType::String => Ok(self.check_string(value, descriptor, scalar, idx)),
            ScalarType::Key => self.check_key(value, descriptor, scalar, idx),
            ScalarType::Handle => self.check_handle(value, descriptor, idx),
            ScalarType::Enum => self.check_enum(value, descriptor, scalar, idx),
            // Reserved for future extension.
            ScalarType::Date | ScalarType::Struct | ScalarType::Object | ScalarType::GeoJson => {
                Ok(true)
            }
        }
    }

    /// Arrays and sets: sequence shape, cardinality, uniqueness for sets,
    /// then every element against the shared element section. A failing
    /// element attaches its containing sequence as the parent value.
    fn walk_sequence(
        &mut self,
        value: &mut Value,
        descriptor: &str,
        seq: &SeqSection,
        unique: bool,
        idx: Option<usize>,
    ) -> Walk {
        let Some(len) = value.as_array().map(Vec::len) else {
            return Ok(self.fail(
                idx,
                Code::NotAnArray,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        };

        let low = seq.min_items.map_or(false, |min| (len as u64) < min);
        let high = seq.max_items.map_or(false, |max| (len as u64) > max);
        if low || high {
            return Ok(self.fail(
                idx,
                Code::ValueOutOfRange,
                descriptor,
                Some(value.clone()),
                Extras {
                    section: Some(seq.body.clone()),
                    ..Extras::default()
                },
            ));
        }

        if unique {
            if let Some(items) = value.as_array() {
                for i in 1..items.len() {
                    if items[..i].contains(&items[i]) {
                        return Ok(self.fail(
                            idx,
                            Code::ValueOutOfRange,
                            descriptor,
                            Some(items[i].clone()),
                            Extras {
                                parent_value: Some(value.clone()),
                                ..Extras::default()
                            },
                        ));
                    }
                }
            }
        }

        for i in 0..len {
            self.check_cancel()?;
            let ok = {
                let Some(item) = value.get_mut(i) else {
                    continue;
                };
                self.walk(item, descriptor, seq.body, idx)?
            };
            if !ok {
                self.report.attach_parent_value(idx, value.clone());
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Dicts: mapping shape, then every key against the key section and
    /// every value against the value section. A key rewritten by
    /// resolution renames its entry once iteration completes.
    fn walk_dict(
        &mut self,
        value: &mut Value,
        descriptor: &str,
        dict: &DictSection,
        idx: Option<usize>,
    ) -> Walk {
        if !value.is_object() {
            return Ok(self.fail(
                idx,
                Code::NotAnObject,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ));
        }

        let keys: Vec<String> = value
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        let mut renames: Vec<(String, String)> = Vec::new();

        for key in keys {
            self.check_cancel()?;

            if let Some(key_section) = dict.key {
                let mut key_value = Value::String(key.clone());
                let ok = self.walk(&mut key_value, descriptor, key_section, idx)?;
                if !ok {
                    self.report.attach_parent_value(idx, value.clone());
                    return Ok(false);
                }
                match key_value.as_str() {
                    Some(resolved) if resolved != key => {
                        renames.push((key.clone(), resolved.to_string()))
                    }
                    _ => (),
                }
            }

            if let Some(value_section) = dict.value {
                let ok = {
                    let Some(item) = value.get_mut(&key) else {
                        continue;
                    };
                    self.walk(item, descriptor, value_section, idx)?
                };
                if !ok {
                    self.report.attach_parent_value(idx, value.clone());
                    return Ok(false);
                }
            }
        }

        if let Some(object) = value.as_object_mut() {
            for (old, new) in renames {
                if let Some(item) = object.remove(&old) {
                    object.insert(new, item);
                }
            }
        }
        Ok(true)
    }
}
