use serde::{Deserialize, Serialize};

/// Config names every in-store field tag the validation core references.
/// A deployment renames stored tags by deserializing its own copy over the
/// defaults; nothing downstream hard-codes a stored name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Dimension tags of a data section.
    pub scalar: String,
    pub array: String,
    pub set: String,
    pub dict: String,
    pub dict_key: String,
    pub dict_value: String,

    // Scalar qualifiers.
    pub data_type: String,
    pub valid_range: String,
    pub regexp: String,
    pub kind: String,

    // Array and set cardinality.
    pub min_items: String,
    pub max_items: String,

    // Range bounds.
    pub min_inclusive: String,
    pub min_exclusive: String,
    pub max_inclusive: String,
    pub max_exclusive: String,

    // Scalar type tag values.
    pub type_boolean: String,
    pub type_integer: String,
    pub type_number: String,
    pub type_timestamp: String,
    pub type_string: String,
    pub type_key: String,
    pub type_handle: String,
    pub type_enum: String,
    pub type_date: String,
    pub type_struct: String,
    pub type_object: String,
    pub type_geojson: String,

    // Kind qualifier wildcards.
    pub any_term: String,
    pub any_enum: String,
    pub any_descriptor: String,
    pub any_object: String,

    // Enumeration graph and code section.
    pub predicate_enum: String,
    pub local_identifier: String,

    // Namespace references.
    pub namespace_identifier: String,
    pub default_namespace_key: String,

    // Report messages.
    pub default_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scalar: "_scalar".to_string(),
            array: "_array".to_string(),
            set: "_set".to_string(),
            dict: "_dict".to_string(),
            dict_key: "_dict-key".to_string(),
            dict_value: "_dict-value".to_string(),

            data_type: "_type".to_string(),
            valid_range: "_valid-range".to_string(),
            regexp: "_regexp".to_string(),
            kind: "_kind".to_string(),

            min_items: "_min-items".to_string(),
            max_items: "_max-items".to_string(),

            min_inclusive: "_min-range-inclusive".to_string(),
            min_exclusive: "_min-range-exclusive".to_string(),
            max_inclusive: "_max-range-inclusive".to_string(),
            max_exclusive: "_max-range-exclusive".to_string(),

            type_boolean: "_type_boolean".to_string(),
            type_integer: "_type_integer".to_string(),
            type_number: "_type_number".to_string(),
            type_timestamp: "_type_timestamp".to_string(),
            type_string: "_type_string".to_string(),
            type_key: "_type_key".to_string(),
            type_handle: "_type_handle".to_string(),
            type_enum: "_type_enum".to_string(),
            type_date: "_type_date".to_string(),
            type_struct: "_type_struct".to_string(),
            type_object: "_type_object".to_string(),
            type_geojson: "_type_geojson".to_string(),

            any_term: "_any-term".to_string(),
            any_enum: "_any-enum".to_string(),
            any_descriptor: "_any-descriptor".to_string(),
            any_object: "_any-object".to_string(),

            predicate_enum: "_predicate_enum-of".to_string(),
            local_identifier: "_lid".to_string(),

            namespace_identifier: "_nid".to_string(),
            default_namespace_key: ":".to_string(),

            default_language: "en".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scalar, "_scalar");
        assert_eq!(config.valid_range, "_valid-range");
        assert_eq!(config.predicate_enum, "_predicate_enum-of");
        assert_eq!(config.default_namespace_key, ":");
    }

    #[test]
    fn test_partial_override() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "data_type": "type",
            "default_language": "it",
        }))
        .unwrap();

        assert_eq!(config.data_type, "type");
        assert_eq!(config.default_language, "it");
        // Untouched fields keep their defaults.
        assert_eq!(config.scalar, "_scalar");
        assert_eq!(config.local_identifier, "_lid");
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config, back);
    }
}
