use dictionary::Config;
use serde_json::{Map, Value};

/// ScalarType is the set of recognized scalar type tags.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScalarType {
    Boolean,
    Integer,
    Number,
    Timestamp,
    String,
    Key,
    Handle,
    Enum,
    Date,
    Struct,
    Object,
    GeoJson,
}

impl ScalarType {
    /// Map a stored type tag to its scalar type. Unknown tags are None,
    /// which validation reports as unsupported.
    pub fn from_tag(tag: &str, config: &Config) -> Option<Self> {
        if tag == config.type_boolean {
            Some(Self::Boolean)
        } else if tag == config.type_integer {
            Some(Self::Integer)
        } else if tag == config.type_number {
            Some(Self::Number)
        } else if tag == config.type_timestamp {
            Some(Self::Timestamp)
        } else if tag == config.type_string {
            Some(Self::String)
        } else if tag == config.type_key {
            Some(Self::Key)
        } else if tag == config.type_handle {
            Some(Self::Handle)
        } else if tag == config.type_enum {
            Some(Self::Enum)
        } else if tag == config.type_date {
            Some(Self::Date)
        } else if tag == config.type_struct {
            Some(Self::Struct)
        } else if tag == config.type_object {
            Some(Self::Object)
        } else if tag == config.type_geojson {
            Some(Self::GeoJson)
        } else {
            None
        }
    }
}

/// ScalarSection is the leaf level of a data section: the declared type
/// tag and its qualifiers, all raw so validation decides how malformed
/// qualifiers are reported.
#[derive(Debug)]
pub struct ScalarSection<'s> {
    pub data_type: Option<&'s Value>,
    pub range: Option<&'s Value>,
    pub regexp: Option<&'s Value>,
    pub kind: Option<&'s Value>,
}

/// SeqSection is an array or set level. The tag body doubles as the
/// element data section; the cardinality keys are read off it here.
#[derive(Debug)]
pub struct SeqSection<'s> {
    pub body: &'s Value,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
}

/// DictSection is a mapping level with schemas for keys and for values.
/// An absent side leaves that side unconstrained.
#[derive(Debug)]
pub struct DictSection<'s> {
    pub key: Option<&'s Value>,
    pub value: Option<&'s Value>,
}

/// Dimension is the per-level view of a data section: exactly one of the
/// four container tags.
#[derive(Debug)]
pub enum Dimension<'s> {
    Scalar(ScalarSection<'s>),
    Array(SeqSection<'s>),
    Set(SeqSection<'s>),
    Dict(DictSection<'s>),
}

impl<'s> Dimension<'s> {
    /// Read one level of a data section. None when the section is not an
    /// object, or carries zero or several dimension tags.
    pub fn parse(section: &'s Value, config: &Config) -> Option<Dimension<'s>> {
        let section = section.as_object()?;

        let tags = [
            section.contains_key(&config.scalar),
            section.contains_key(&config.array),
            section.contains_key(&config.set),
            section.contains_key(&config.dict),
        ];
        if tags.iter().filter(|present| **present).count() != 1 {
            return None;
        }

        if let Some(body) = section.get(&config.scalar) {
            let body = body.as_object()?;
            Some(Dimension::Scalar(ScalarSection {
                data_type: body.get(&config.data_type),
                range: body.get(&config.valid_range),
                regexp: body.get(&config.regexp),
                kind: body.get(&config.kind),
            }))
        } else if let Some(body) = section.get(&config.array) {
            Some(Dimension::Array(seq_section(body, config)?))
        } else if let Some(body) = section.get(&config.set) {
            Some(Dimension::Set(seq_section(body, config)?))
        } else {
            let body = section.get(&config.dict)?.as_object()?;
            Some(Dimension::Dict(DictSection {
                key: body.get(&config.dict_key),
                value: body.get(&config.dict_value),
            }))
        }
    }
}

fn seq_section<'s>(body: &'s Value, config: &Config) -> Option<SeqSection<'s>> {
    let map: &Map<String, Value> = body.as_object()?;
    Some(SeqSection {
        body,
        min_items: map.get(&config.min_items).and_then(Value::as_u64),
        max_items: map.get(&config.max_items).and_then(Value::as_u64),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exactly_one_dimension() {
        let config = Config::default();

        for section in [
            json!({}),
            json!({"_scalar": {}, "_array": {}}),
            json!("not an object"),
            json!({"_other": {}}),
        ] {
            assert!(
                Dimension::parse(&section, &config).is_none(),
                "section: {section}"
            );
        }

        let section = json!({"_scalar": {"_type": "_type_boolean"}});
        assert!(matches!(
            Dimension::parse(&section, &config),
            Some(Dimension::Scalar(_))
        ));
    }

    #[test]
    fn test_scalar_qualifiers() {
        let config = Config::default();
        let section = json!({"_scalar": {
            "_type": "_type_integer",
            "_valid-range": {"_min-range-inclusive": 0},
            "_regexp": "^x",
            "_kind": ["TYPE_COLOR"],
        }});

        let Some(Dimension::Scalar(scalar)) = Dimension::parse(&section, &config) else {
            panic!("expected a scalar dimension");
        };
        assert_eq!(scalar.data_type, Some(&json!("_type_integer")));
        assert_eq!(scalar.range, Some(&json!({"_min-range-inclusive": 0})));
        assert_eq!(scalar.regexp, Some(&json!("^x")));
        assert_eq!(scalar.kind, Some(&json!(["TYPE_COLOR"])));
    }

    #[test]
    fn test_sequence_body_is_element_section() {
        let config = Config::default();
        let section = json!({"_array": {
            "_scalar": {"_type": "_type_string"},
            "_min-items": 1,
            "_max-items": 3,
        }});

        let Some(Dimension::Array(seq)) = Dimension::parse(&section, &config) else {
            panic!("expected an array dimension");
        };
        assert_eq!(seq.min_items, Some(1));
        assert_eq!(seq.max_items, Some(3));
        // The body itself parses as the element dimension.
        assert!(matches!(
            Dimension::parse(seq.body, &config),
            Some(Dimension::Scalar(_))
        ));
    }

    #[test]
    fn test_dict_sides() {
        let config = Config::default();
        let section = json!({"_dict": {
            "_dict-key": {"_scalar": {"_type": "_type_key"}},
            "_dict-value": {"_scalar": {"_type": "_type_number"}},
        }});

        let Some(Dimension::Dict(dict)) = Dimension::parse(&section, &config) else {
            panic!("expected a dict dimension");
        };
        assert!(dict.key.is_some());
        assert!(dict.value.is_some());
    }

    #[test]
    fn test_type_tags() {
        let config = Config::default();
        assert_eq!(
            ScalarType::from_tag("_type_timestamp", &config),
            Some(ScalarType::Timestamp)
        );
        assert_eq!(ScalarType::from_tag("_type_vector", &config), None);
    }
}
