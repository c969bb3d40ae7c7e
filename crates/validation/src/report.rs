use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use xxhash_rust::xxh3::xxh3_128;

/// Code is the stable status taxonomy. Negative codes are setup and schema
/// defects, zero is idle, positive codes are validation findings, and
/// codes of one hundred and above are infrastructure conditions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Code {
    ExpectingDataDimension = -4,
    RangeNotAnObject = -3,
    NotArrayDataKind = -2,
    InvalidDataKindOption = -1,
    Ok = 0,
    NotAnObject = 1,
    NotAnArray = 2,
    EmptyObject = 3,
    UnknownDescriptor = 4,
    NotADescriptor = 5,
    NotAScalar = 6,
    MissingScalarDataType = 7,
    NotABoolean = 8,
    NotAnInteger = 9,
    NotANumber = 10,
    ValueOutOfRange = 11,
    ValueLowRange = 12,
    ValueHighRange = 13,
    ValueNotATimestamp = 14,
    Unsupported = 15,
    NotAString = 16,
    NoMatchRegexp = 17,
    EmptyKey = 18,
    ValueNotTerm = 19,
    NotAnEnum = 20,
    NotCorrectEnumType = 21,
    NotAStructureDefinition = 22,
    NoRefDefaultNamespaceKey = 23,
    UnknownDocument = 24,
    BadKeyValue = 25,
    BadHandleValue = 26,
    BadCollectionName = 27,
    UnknownCollection = 28,
    StoreError = 100,
    Cancelled = 101,
}

impl Code {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Code::Ok)
    }

    /// The literal message in `language`, falling back to the default
    /// language and finally to English.
    pub fn message(&self, language: &str, default_language: &str) -> &'static str {
        self.localized(language)
            .or_else(|| self.localized(default_language))
            .unwrap_or_else(|| self.english())
    }

    fn localized(&self, language: &str) -> Option<&'static str> {
        match language {
            "en" => Some(self.english()),
            "it" => Some(self.italian()),
            _ => None,
        }
    }

    fn english(&self) -> &'static str {
        match self {
            Code::ExpectingDataDimension => {
                "data section is missing a dimension tag or carries more than one"
            }
            Code::RangeNotAnObject => "range qualifier is not an object",
            Code::NotArrayDataKind => "kind qualifier is missing or not a list",
            Code::InvalidDataKindOption => "unrecognized kind qualifier option",
            Code::Ok => "valid",
            Code::NotAnObject => "value is not an object",
            Code::NotAnArray => "value is not an array",
            Code::EmptyObject => "object has no properties",
            Code::UnknownDescriptor => "descriptor is not a known term",
            Code::NotADescriptor => "term has no data section and cannot describe a value",
            Code::NotAScalar => "expected a scalar value",
            Code::MissingScalarDataType => "scalar section declares no data type",
            Code::NotABoolean => "value is not a boolean",
            Code::NotAnInteger => "value is not an integer",
            Code::NotANumber => "value is not a number",
            Code::ValueOutOfRange => "value cannot satisfy the declared range",
            Code::ValueLowRange => "value is below the declared range",
            Code::ValueHighRange => "value is above the declared range",
            Code::ValueNotATimestamp => "value cannot be interpreted as a timestamp",
            Code::Unsupported => "unsupported data type or qualifier",
            Code::NotAString => "value is not a string",
            Code::NoMatchRegexp => "value does not match the declared pattern",
            Code::EmptyKey => "key value is empty",
            Code::ValueNotTerm => "value does not reference a known term",
            Code::NotAnEnum => "term is not an enumeration element",
            Code::NotCorrectEnumType => "term does not belong to the required enumeration",
            Code::NotAStructureDefinition => "term is not a structure definition",
            Code::NoRefDefaultNamespaceKey => {
                "references to the default namespace are forbidden"
            }
            Code::UnknownDocument => "document not found",
            Code::BadKeyValue => "invalid document key",
            Code::BadHandleValue => "invalid document handle",
            Code::BadCollectionName => "invalid collection name",
            Code::UnknownCollection => "collection not found",
            Code::StoreError => "dictionary store error",
            Code::Cancelled => "validation was cancelled",
        }
    }

    fn italian(&self) -> &'static str {
        match self {
            Code::ExpectingDataDimension => {
                "la sezione dati non ha un tag di dimensione o ne ha più di uno"
            }
            Code::RangeNotAnObject => "il qualificatore di intervallo non è un oggetto",
            Code::NotArrayDataKind => "il qualificatore di categoria manca o non è una lista",
            Code::InvalidDataKindOption => "opzione di categoria non riconosciuta",
            Code::Ok => "valido",
            Code::NotAnObject => "il valore non è un oggetto",
            Code::NotAnArray => "il valore non è un array",
            Code::EmptyObject => "l'oggetto non ha proprietà",
            Code::UnknownDescriptor => "il descrittore non è un termine conosciuto",
            Code::NotADescriptor => {
                "il termine non ha una sezione dati e non può descrivere un valore"
            }
            Code::NotAScalar => "è atteso un valore scalare",
            Code::MissingScalarDataType => "la sezione scalare non dichiara un tipo di dati",
            Code::NotABoolean => "il valore non è un booleano",
            Code::NotAnInteger => "il valore non è un intero",
            Code::NotANumber => "il valore non è un numero",
            Code::ValueOutOfRange => "il valore non può soddisfare l'intervallo dichiarato",
            Code::ValueLowRange => "il valore è sotto l'intervallo dichiarato",
            Code::ValueHighRange => "il valore è sopra l'intervallo dichiarato",
            Code::ValueNotATimestamp => {
                "il valore non è interpretabile come marca temporale"
            }
            Code::Unsupported => "tipo di dati o qualificatore non supportato",
            Code::NotAString => "il valore non è una stringa",
            Code::NoMatchRegexp => {
                "il valore non rispetta l'espressione regolare dichiarata"
            }
            Code::EmptyKey => "la chiave è vuota",
            Code::ValueNotTerm => "il valore non referenzia un termine conosciuto",
            Code::NotAnEnum => "il termine non è un elemento di enumerazione",
            Code::NotCorrectEnumType => "il termine non appartiene all'enumerazione richiesta",
            Code::NotAStructureDefinition => "il termine non è una definizione di struttura",
            Code::NoRefDefaultNamespaceKey => {
                "i riferimenti allo spazio dei nomi predefinito non sono ammessi"
            }
            Code::UnknownDocument => "documento non trovato",
            Code::BadKeyValue => "chiave di documento non valida",
            Code::BadHandleValue => "handle di documento non valido",
            Code::BadCollectionName => "nome di collezione non valido",
            Code::UnknownCollection => "collezione non trovata",
            Code::StoreError => "errore del dizionario",
            Code::Cancelled => "validazione annullata",
        }
    }
}

/// Status is the code and localized message of one report slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    pub fn new(code: Code, language: &str, default_language: &str) -> Self {
        Self {
            code: code.code(),
            message: code.message(language, default_language).to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Change is one logged value resolution: the descriptor under which the
/// original value was rewritten into its canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub field: String,
    pub original: Value,
    pub resolved: Value,
}

/// Slot is one entry of the validation report, corresponding to one
/// logical input: the single value, one element of a zipped list, or one
/// object of a bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub status: Status,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub descriptor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub changes: BTreeMap<String, Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "parentValue")]
    pub parent_value: Option<Value>,
}

impl Slot {
    pub fn idle(status: Status, descriptor: String) -> Self {
        Self {
            status,
            descriptor,
            value: None,
            changes: BTreeMap::new(),
            section: None,
            regexp: None,
            parent_value: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Optional attachments of a status write.
#[derive(Debug, Default)]
pub struct Extras {
    pub section: Option<Value>,
    pub regexp: Option<String>,
    pub parent_value: Option<Value>,
}

/// Report is the structured outcome of one validate call: a single slot,
/// or one slot per element of a zipped list or object bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Single(Slot),
    Indexed(Vec<Slot>),
}

impl Report {
    /// True iff every slot is idle.
    pub fn ok(&self) -> bool {
        match self {
            Report::Single(slot) => slot.is_ok(),
            Report::Indexed(slots) => slots.iter().all(Slot::is_ok),
        }
    }

    pub fn as_single(&self) -> Option<&Slot> {
        match self {
            Report::Single(slot) => Some(slot),
            Report::Indexed(_) => None,
        }
    }

    pub fn as_indexed(&self) -> Option<&[Slot]> {
        match self {
            Report::Single(_) => None,
            Report::Indexed(slots) => Some(slots),
        }
    }

    fn slot_mut(&mut self, idx: Option<usize>) -> &mut Slot {
        match (self, idx) {
            (Report::Single(slot), None) => slot,
            (Report::Indexed(slots), Some(i)) => &mut slots[i],
            (Report::Single(_), Some(_)) | (Report::Indexed(_), None) => {
                panic!("report shape does not match the slot index")
            }
        }
    }

    /// Write a fresh slot. An `Ok` status resets the slot; any other
    /// status replaces it, discarding whatever the slot held. Returns true
    /// iff the resulting slot is idle.
    pub fn set_status(
        &mut self,
        idx: Option<usize>,
        status: Status,
        descriptor: &str,
        value: Option<Value>,
        extras: Extras,
    ) -> bool {
        let ok = status.is_ok();
        *self.slot_mut(idx) = Slot {
            status,
            descriptor: descriptor.to_string(),
            value,
            changes: BTreeMap::new(),
            section: extras.section,
            regexp: extras.regexp,
            parent_value: extras.parent_value,
        };
        ok
    }

    /// Log a value resolution into the slot's changes map, keyed by the
    /// stable digest of the descriptor and the original value. Idempotent
    /// for a repeated descriptor and value pair.
    pub fn log_resolution(
        &mut self,
        idx: Option<usize>,
        descriptor: &str,
        original: Value,
        resolved: Value,
    ) {
        let key = change_key(descriptor, &original);
        self.slot_mut(idx).changes.entry(key).or_insert(Change {
            field: descriptor.to_string(),
            original,
            resolved,
        });
    }

    /// Attach the containing value of a failed element, keeping the
    /// nearest parent when containers nest.
    pub fn attach_parent_value(&mut self, idx: Option<usize>, parent: Value) {
        let slot = self.slot_mut(idx);
        slot.parent_value.get_or_insert(parent);
    }
}

/// The stable addressing key of a logged resolution: the lowercase-hex
/// 128-bit digest of the descriptor, a NUL separator, and the compact
/// serialization of the original value.
pub fn change_key(descriptor: &str, original: &Value) -> String {
    let mut buf = Vec::with_capacity(descriptor.len() + 16);
    buf.extend_from_slice(descriptor.as_bytes());
    buf.push(0);
    buf.extend_from_slice(serde_json::to_string(original).unwrap().as_bytes());
    format!("{:032x}", xxh3_128(&buf))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn status(code: Code) -> Status {
        Status::new(code, "en", "en")
    }

    #[test]
    fn test_code_stability() {
        for (code, expect) in [
            (Code::ExpectingDataDimension, -4),
            (Code::Ok, 0),
            (Code::UnknownDescriptor, 4),
            (Code::ValueHighRange, 13),
            (Code::NotAString, 16),
            (Code::NoMatchRegexp, 17),
            (Code::ValueNotTerm, 19),
            (Code::StoreError, 100),
            (Code::Cancelled, 101),
        ] {
            assert_eq!(code.code(), expect);
        }
    }

    #[test]
    fn test_message_fallback() {
        // Requested language wins.
        assert_eq!(Code::Ok.message("it", "en"), "valido");
        // Unknown language falls back to the default language.
        assert_eq!(Code::Ok.message("fr", "it"), "valido");
        // Unknown default falls back to English.
        assert_eq!(Code::Ok.message("fr", "de"), "valid");
    }

    #[test]
    fn test_set_status_replaces_and_resets() {
        let mut report = Report::Single(Slot::idle(status(Code::Ok), String::new()));
        report.log_resolution(None, "D", json!("x"), json!("y"));
        assert_eq!(report.as_single().unwrap().changes.len(), 1);

        // An error replaces the slot; the resolution log is discarded.
        assert!(!report.set_status(
            None,
            status(Code::NotAnInteger),
            "D",
            Some(json!("x")),
            Extras::default(),
        ));
        let slot = report.as_single().unwrap();
        assert_eq!(slot.status.code, 9);
        assert_eq!(slot.descriptor, "D");
        assert!(slot.changes.is_empty());

        // An OK write resets.
        assert!(report.set_status(None, status(Code::Ok), "", None, Extras::default()));
        assert!(report.ok());
    }

    #[test]
    fn test_log_resolution_idempotent() {
        let mut report = Report::Single(Slot::idle(status(Code::Ok), String::new()));
        report.log_resolution(None, "D", json!("1970-01-01"), json!(0));
        report.log_resolution(None, "D", json!("1970-01-01"), json!(0));
        let slot = report.as_single().unwrap();
        assert_eq!(slot.changes.len(), 1);

        let change = &slot.changes[&change_key("D", &json!("1970-01-01"))];
        assert_eq!(
            change,
            &Change {
                field: "D".to_string(),
                original: json!("1970-01-01"),
                resolved: json!(0),
            }
        );
    }

    #[test]
    fn test_change_key_is_stable() {
        let a = change_key("D3", &json!("1970-01-01T00:00:00Z"));
        let b = change_key("D3", &json!("1970-01-01T00:00:00Z"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        // Descriptor and value both participate.
        assert_ne!(a, change_key("D4", &json!("1970-01-01T00:00:00Z")));
        assert_ne!(a, change_key("D3", &json!("1970-01-02T00:00:00Z")));
    }

    #[test]
    fn test_serialization_shape() {
        let mut report = Report::Indexed(vec![
            Slot::idle(status(Code::Ok), "D".to_string()),
            Slot::idle(status(Code::Ok), "D".to_string()),
        ]);
        report.set_status(
            Some(1),
            status(Code::ValueHighRange),
            "D",
            Some(json!(11)),
            Extras {
                section: Some(json!({"_max-range-inclusive": 10})),
                ..Extras::default()
            },
        );

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!([
                {"status": {"code": 0, "message": "valid"}, "descriptor": "D"},
                {
                    "status": {"code": 13, "message": "value is above the declared range"},
                    "descriptor": "D",
                    "value": 11,
                    "section": {"_max-range-inclusive": 10},
                },
            ])
        );
    }
}
