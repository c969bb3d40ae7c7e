use dictionary::{Config, Store};
use regex::Regex;
use serde_json::Value;
use time::macros::format_description;
use tracing::debug;

use crate::section::ScalarSection;
use crate::{Code, Extras, Number, Validator};

/// Outcome of evaluating a range qualifier against a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RangeOutcome {
    Pass,
    NotAnObject,
    Low,
    High,
    Incomparable,
}

impl<S: Store> Validator<S> {
    pub(crate) fn check_boolean(
        &mut self,
        value: &Value,
        descriptor: &str,
        idx: Option<usize>,
    ) -> bool {
        if value.is_boolean() {
            true
        } else {
            self.fail(
                idx,
                Code::NotABoolean,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            )
        }
    }

    pub(crate) fn check_integer(
        &mut self,
        value: &Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> bool {
        match json_number(value) {
            Some(number) if !number.is_float() => {
                self.check_number_range(number, value, descriptor, scalar.range, idx)
            }
            _ => self.fail(
                idx,
                Code::NotAnInteger,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ),
        }
    }

    pub(crate) fn check_number(
        &mut self,
        value: &Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> bool {
        match json_number(value) {
            Some(number) => self.check_number_range(number, value, descriptor, scalar.range, idx),
            None => self.fail(
                idx,
                Code::NotANumber,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            ),
        }
    }

    /// Numbers are epoch milliseconds; strings must parse as a date-time
    /// or a plain date. A parsed string is rewritten in place to its
    /// millisecond count and logged, but only under `resolve`.
    pub(crate) fn check_timestamp(
        &mut self,
        value: &mut Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> bool {
        if let Some(number) = json_number(value) {
            let current = value.clone();
            return self.check_number_range(number, &current, descriptor, scalar.range, idx);
        }

        let text = match value.as_str() {
            Some(text) => text.to_string(),
            None => {
                return self.fail(
                    idx,
                    Code::ValueNotATimestamp,
                    descriptor,
                    Some(value.clone()),
                    Extras::default(),
                )
            }
        };
        let Some(millis) = parse_timestamp(&text) else {
            return self.fail(
                idx,
                Code::ValueNotATimestamp,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            );
        };

        if self.resolve {
            let original = value.clone();
            *value = Value::from(millis);
            self.report
                .log_resolution(idx, descriptor, original, value.clone());
            debug!(descriptor, text = %text, millis, "resolved timestamp string");
        }

        let current = value.clone();
        self.check_number_range(Number::Signed(millis), &current, descriptor, scalar.range, idx)
    }

    pub(crate) fn check_string(
        &mut self,
        value: &Value,
        descriptor: &str,
        scalar: &ScalarSection,
        idx: Option<usize>,
    ) -> bool {
        let Some(text) = value.as_str() else {
            return self.fail(
                idx,
                Code::NotAString,
                descriptor,
                Some(value.clone()),
                Extras::default(),
            );
        };

        if let Some(pattern) = scalar.regexp {
            let Some(pattern) = pattern.as_str() else {
                return self.fail(
                    idx,
                    Code::Unsupported,
                    descriptor,
                    Some(value.clone()),
                    Extras {
                        section: Some(pattern.clone()),
                        ..Extras::default()
                    },
                );
            };
            match Regex::new(pattern) {
                Err(_) => {
                    return self.fail(
                        idx,
                        Code::Unsupported,
                        descriptor,
                        Some(value.clone()),
                        Extras {
                            regexp: Some(pattern.to_string()),
                            ..Extras::default()
                        },
                    )
                }
                Ok(re) if !re.is_match(text) => {
                    return self.fail(
                        idx,
                        Code::NoMatchRegexp,
                        descriptor,
                        Some(value.clone()),
                        Extras {
                            regexp: Some(pattern.to_string()),
                            ..Extras::default()
                        },
                    )
                }
                Ok(_) => (),
            }
        }

        if let Some(range) = scalar.range {
            let outcome = string_range(range, text, self.cache.config());
            return self.range_status(outcome, value, descriptor, range, idx);
        }
        true
    }

    fn check_number_range(
        &mut self,
        number: Number,
        value: &Value,
        descriptor: &str,
        range: Option<&Value>,
        idx: Option<usize>,
    ) -> bool {
        let Some(range) = range else {
            return true;
        };
        let outcome = number_range(range, number, self.cache.config());
        self.range_status(outcome, value, descriptor, range, idx)
    }

    fn range_status(
        &mut self,
        outcome: RangeOutcome,
        value: &Value,
        descriptor: &str,
        range: &Value,
        idx: Option<usize>,
    ) -> bool {
        let code = match outcome {
            RangeOutcome::Pass => return true,
            RangeOutcome::NotAnObject => Code::RangeNotAnObject,
            RangeOutcome::Low => Code::ValueLowRange,
            RangeOutcome::High => Code::ValueHighRange,
            RangeOutcome::Incomparable => Code::ValueOutOfRange,
        };
        self.fail(
            idx,
            code,
            descriptor,
            Some(value.clone()),
            Extras {
                section: Some(range.clone()),
                ..Extras::default()
            },
        )
    }
}

fn json_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(Number::from(n)),
        _ => None,
    }
}

/// Evaluate a numeric range. Bounds are checked in a fixed order so the
/// first violated bound names the outcome.
fn number_range(range: &Value, number: Number, config: &Config) -> RangeOutcome {
    let Some(range) = range.as_object() else {
        return RangeOutcome::NotAnObject;
    };

    for (key, low, inclusive) in [
        (&config.min_inclusive, true, true),
        (&config.min_exclusive, true, false),
        (&config.max_inclusive, false, true),
        (&config.max_exclusive, false, false),
    ] {
        let Some(bound) = range.get(key) else {
            continue;
        };
        let Some(bound) = json_number(bound) else {
            return RangeOutcome::Incomparable;
        };
        let violated = match (low, inclusive) {
            (true, true) => number < bound,
            (true, false) => number <= bound,
            (false, true) => number > bound,
            (false, false) => number >= bound,
        };
        if violated {
            return if low {
                RangeOutcome::Low
            } else {
                RangeOutcome::High
            };
        }
    }
    RangeOutcome::Pass
}

/// Evaluate a string range, comparing code points.
fn string_range(range: &Value, text: &str, config: &Config) -> RangeOutcome {
    let Some(range) = range.as_object() else {
        return RangeOutcome::NotAnObject;
    };

    for (key, low, inclusive) in [
        (&config.min_inclusive, true, true),
        (&config.min_exclusive, true, false),
        (&config.max_inclusive, false, true),
        (&config.max_exclusive, false, false),
    ] {
        let Some(bound) = range.get(key) else {
            continue;
        };
        let Some(bound) = bound.as_str() else {
            return RangeOutcome::Incomparable;
        };
        let violated = match (low, inclusive) {
            (true, true) => text < bound,
            (true, false) => text <= bound,
            (false, true) => text > bound,
            (false, false) => text >= bound,
        };
        if violated {
            return if low {
                RangeOutcome::Low
            } else {
                RangeOutcome::High
            };
        }
    }
    RangeOutcome::Pass
}

/// Parse a timestamp string: an Rfc3339 date-time, or a plain date taken
/// at midnight UTC. Returns epoch milliseconds.
fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(ts) = time::OffsetDateTime::parse(text, &time::format_description::well_known::Rfc3339)
    {
        return Some((ts.unix_timestamp_nanos() / 1_000_000) as i64);
    }
    if let Ok(date) = time::Date::parse(text, &format_description!("[year]-[month]-[day]")) {
        let ts = date.midnight().assume_utc();
        return Some((ts.unix_timestamp_nanos() / 1_000_000) as i64);
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp() {
        for (text, expect) in [
            ("1970-01-01T00:00:00Z", Some(0)),
            ("1970-01-01T00:00:01Z", Some(1_000)),
            ("1970-01-01T00:00:00.250Z", Some(250)),
            ("2022-09-11T10:31:25+02:00", Some(1_662_885_085_000)),
            ("1970-01-01", Some(0)),
            ("1969-12-31", Some(-86_400_000)),
            ("not a date", None),
            ("1970-13-40", None),
            ("10:31:25", None),
        ] {
            assert_eq!(parse_timestamp(text), expect, "text: {text}");
        }
    }

    #[test]
    fn test_number_range_order() {
        let config = Config::default();
        let range = json!({"_min-range-inclusive": 0, "_max-range-inclusive": 10});

        for (value, expect) in [
            (json!(0), RangeOutcome::Pass),
            (json!(10), RangeOutcome::Pass),
            (json!(-1), RangeOutcome::Low),
            (json!(11), RangeOutcome::High),
        ] {
            let number = json_number(&value).unwrap();
            assert_eq!(number_range(&range, number, &config), expect);
        }

        // Exclusive bounds reject their endpoints.
        let range = json!({"_min-range-exclusive": 0, "_max-range-exclusive": 10});
        for (value, expect) in [
            (json!(0), RangeOutcome::Low),
            (json!(10), RangeOutcome::High),
            (json!(5), RangeOutcome::Pass),
        ] {
            let number = json_number(&value).unwrap();
            assert_eq!(number_range(&range, number, &config), expect);
        }

        // Malformed ranges.
        let number = json_number(&json!(5)).unwrap();
        assert_eq!(
            number_range(&json!("0..10"), number, &config),
            RangeOutcome::NotAnObject
        );
        assert_eq!(
            number_range(&json!({"_min-range-inclusive": "zero"}), number, &config),
            RangeOutcome::Incomparable
        );
    }

    #[test]
    fn test_string_range() {
        let config = Config::default();
        let range = json!({"_min-range-inclusive": "b", "_max-range-exclusive": "m"});

        for (text, expect) in [
            ("b", RangeOutcome::Pass),
            ("hello", RangeOutcome::Pass),
            ("a", RangeOutcome::Low),
            ("m", RangeOutcome::High),
            ("zebra", RangeOutcome::High),
        ] {
            assert_eq!(string_range(&range, text, &config), expect, "text: {text}");
        }
    }
}
