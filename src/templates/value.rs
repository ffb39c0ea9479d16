//! Typed attribute values and the ordered attribute bag.
//!
//! Every field a template or module carries is a typed scalar or array
//! value keyed by name. Keeping the values strongly typed (instead of raw
//! text) makes the overlay logic in the resolver exhaustive: a new value
//! kind fails to compile until every merge path handles it.

use ahash::AHashMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Float(f32),
    Bool(bool),
    String(String),
    StringArray(Vec<String>),
    /// Symbolic constant (armor class, build flag, ...). Kept distinct from
    /// free-form text so downstream interpreters can validate it.
    Enum(String),
}

impl AttributeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttributeValue::Float(value) => Some(*value),
            AttributeValue::Integer(value) => Some(*value as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) | AttributeValue::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            AttributeValue::StringArray(values) => Some(values),
            _ => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

/// Ordered mapping from field name to value.
///
/// Lookup goes through a hash index; insertion order is preserved so debug
/// output and re-serialization are stable. Within one bag names are unique:
/// writing an existing name replaces the value in its original slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    entries: Vec<(String, AttributeValue)>,
    index: AHashMap<String, usize>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. The last write for a name wins, keeping the name's
    /// original position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => self.entries[slot].1 = value.into(),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value.into()));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.index.get(name).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Overlay `overrides` onto this bag field by field: matching names take
    /// the overriding value, new names append after the existing fields.
    pub fn apply(&mut self, overrides: &AttributeBag) {
        for (name, value) in overrides.iter() {
            self.set(name, value.clone());
        }
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeBag {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        let mut bag = AttributeBag::new();
        for (name, value) in iter {
            bag.set(name, value);
        }
        bag
    }
}

impl Serialize for AttributeBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins_in_place() {
        let mut bag = AttributeBag::new();
        bag.set("HitPoints", 100i64);
        bag.set("Side", "America");
        bag.set("HitPoints", 150i64);

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("HitPoints"), Some(&AttributeValue::Integer(150)));

        // Rewriting a field keeps its original slot.
        let names: Vec<&str> = bag.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["HitPoints", "Side"]);
    }

    #[test]
    fn test_apply_overlays_and_appends() {
        let mut base = AttributeBag::new();
        base.set("HitPoints", 100i64);
        base.set("Side", "America");

        let mut over = AttributeBag::new();
        over.set("Side", "China");
        over.set("BuildCost", 800i64);

        base.apply(&over);

        assert_eq!(base.get("HitPoints"), Some(&AttributeValue::Integer(100)));
        assert_eq!(base.get("Side").and_then(|v| v.as_str()), Some("China"));
        assert_eq!(base.get("BuildCost"), Some(&AttributeValue::Integer(800)));

        let names: Vec<&str> = base.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["HitPoints", "Side", "BuildCost"]);
    }

    #[test]
    fn test_typed_accessors() {
        let value = AttributeValue::Integer(3);
        assert_eq!(value.as_float(), Some(3.0));
        assert_eq!(AttributeValue::Float(2.5).as_integer(), None);
        assert_eq!(AttributeValue::Bool(true).as_bool(), Some(true));
        assert_eq!(AttributeValue::Integer(1).as_bool(), None);

        let refs = AttributeValue::StringArray(vec!["TreadL".to_string(), "TreadR".to_string()]);
        assert_eq!(refs.as_string_array().map(|a| a.len()), Some(2));
        assert_eq!(refs.as_str(), None);
    }

    #[test]
    fn test_enum_and_string_both_expose_str() {
        assert_eq!(AttributeValue::Enum("ARMOR_HEAVY".to_string()).as_str(), Some("ARMOR_HEAVY"));
        assert_eq!(AttributeValue::String("a name".to_string()).as_str(), Some("a name"));
        assert_ne!(
            AttributeValue::Enum("X".to_string()),
            AttributeValue::String("X".to_string())
        );
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let mut bag = AttributeBag::new();
        bag.set("Zeta", 1i64);
        bag.set("Alpha", 2i64);

        let json = serde_json::to_string(&bag).unwrap();
        assert_eq!(json, r#"{"Zeta":1,"Alpha":2}"#);
    }
}
