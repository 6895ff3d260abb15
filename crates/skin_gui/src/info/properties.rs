//! Case-insensitive window property bag

use std::collections::HashMap;
use std::fmt;

/// A typed property value with loose conversions between types
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Text value
    String(String),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Floating-point value
    Double(f64),
}

impl PropertyValue {
    /// Value as text (empty string is the "unset" value)
    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// Value as integer; unparsable text converts to 0
    pub fn as_integer(&self) -> i64 {
        match self {
            Self::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|d| d as i64))
                    .unwrap_or(0)
            }
            Self::Int(i) => *i,
            Self::Bool(b) => i64::from(*b),
            Self::Double(d) => *d as i64,
        }
    }

    /// Value as boolean; text is true unless empty, "0" or "false"
    pub fn as_boolean(&self) -> bool {
        match self {
            Self::String(s) => {
                let s = s.trim();
                !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
            }
            Self::Int(i) => *i != 0,
            Self::Bool(b) => *b,
            Self::Double(d) => *d != 0.0,
        }
    }

    /// Value as double; unparsable text converts to 0.0
    pub fn as_double(&self) -> f64 {
        match self {
            Self::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Self::Int(i) => *i as f64,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Double(d) => *d,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Self::Double(d) => write!(f, "{d}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Window property storage with case-insensitive keys.
///
/// Reading a missing key yields an empty string value rather than an error.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    values: HashMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.values.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Get a property, empty string if unset
    pub fn get(&self, key: &str) -> PropertyValue {
        self.values
            .get(&key.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| PropertyValue::String(String::new()))
    }

    /// True if the key has been set
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_ascii_lowercase())
    }

    /// Remove one property
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.values.remove(&key.to_ascii_lowercase())
    }

    /// Remove every property
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Number of properties set
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut bag = PropertyBag::new();
        bag.set("XmlFile", "Home.xml");
        assert_eq!(bag.get("xmlfile").as_string(), "Home.xml");
        assert!(bag.contains("XMLFILE"));
    }

    #[test]
    fn test_missing_key_is_empty_string() {
        let bag = PropertyBag::new();
        assert_eq!(bag.get("nothing"), PropertyValue::String(String::new()));
        assert!(!bag.get("nothing").as_boolean());
    }

    #[test]
    fn test_typed_conversions() {
        let mut bag = PropertyBag::new();
        bag.set("count", 42);
        bag.set("ratio", 0.5);
        bag.set("flag", true);
        bag.set("text", "17");

        assert_eq!(bag.get("count").as_string(), "42");
        assert_eq!(bag.get("ratio").as_integer(), 0);
        assert!(bag.get("flag").as_boolean());
        assert_eq!(bag.get("text").as_integer(), 17);
        assert!((bag.get("text").as_double() - 17.0).abs() < f64::EPSILON);
        assert!(!PropertyValue::from("false").as_boolean());
    }

    #[test]
    fn test_clear() {
        let mut bag = PropertyBag::new();
        bag.set("a", "1");
        bag.set("b", "2");
        assert_eq!(bag.len(), 2);
        bag.clear();
        assert!(bag.is_empty());
    }
}
