//! Wire payload built from validated fields.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{Field, SanitizedValue};

/// Field name -> sanitized value, in form declaration order.
///
/// Serializes as a flat JSON object, e.g. `{"email": "bob@example.com"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPayload {
    entries: Vec<(Field, SanitizedValue)>,
}

impl DeliveryPayload {
    /// Build from fields that all passed validation.
    #[must_use]
    pub fn from_validated(entries: Vec<(Field, SanitizedValue)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.entries.iter().map(|(f, value)| (*f, value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DeliveryPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field.as_str(), value.as_str())?;
        }
        map.end()
    }
}
