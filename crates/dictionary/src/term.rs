use serde::Serialize;
use serde_json::Value;

/// Term is the projected view of a dictionary entry: the global key plus
/// the optional sub-records validation consults. Every other stored field,
/// the code section included, is dropped by the projection.
///
/// The three roles are independent presence checks and may coexist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    pub key: String,
    /// Data section: present iff the term is a descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Rule section: present iff the term is a structure definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<Value>,
    /// Enumeration path: the type terms this term belongs to, present iff
    /// the term is an enumeration element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

impl Term {
    pub fn is_descriptor(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_structure(&self) -> bool {
        self.rule.is_some()
    }

    pub fn is_enumeration(&self) -> bool {
        self.path.as_ref().map_or(false, |p| !p.is_empty())
    }

    /// True when the term's enumeration path contains `enum_type`.
    pub fn in_enumeration(&self, enum_type: &str) -> bool {
        self.path
            .as_ref()
            .map_or(false, |p| p.iter().any(|t| t == enum_type))
    }
}
