//! Typed per-node settings.
//!
//! Every buddy list node carries an arbitrary map of named values. Values are
//! persisted with an explicit type tag so they come back with the same type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// A single typed setting value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl SettingValue {
    /// The type tag used in the persisted form.
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::String(_) => "string",
        }
    }

    /// Textual form written to disk. Booleans are stored as `0` / `1`.
    pub fn to_text(&self) -> String {
        match self {
            SettingValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            SettingValue::Int(i) => i.to_string(),
            SettingValue::String(s) => s.clone(),
        }
    }

    /// Parse a persisted value. A missing type tag means `string`.
    pub fn parse(type_name: Option<&str>, text: &str) -> Result<Self, RosterError> {
        match type_name.unwrap_or("string") {
            "string" => Ok(SettingValue::String(text.to_string())),
            "int" => parse_int(text)
                .map(SettingValue::Int)
                .ok_or_else(|| RosterError::InvalidSettingValue {
                    kind: "int",
                    value: text.to_string(),
                }),
            "bool" => match text.trim() {
                "true" => Ok(SettingValue::Bool(true)),
                "false" => Ok(SettingValue::Bool(false)),
                other => parse_int(other)
                    .map(|i| SettingValue::Bool(i != 0))
                    .ok_or_else(|| RosterError::InvalidSettingValue {
                        kind: "bool",
                        value: text.to_string(),
                    }),
            },
            other => Err(RosterError::UnknownSettingType(other.to_string())),
        }
    }
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Named settings of one node, iterated in key order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings(BTreeMap<String, SettingValue>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Store a value, returning the one it replaced.
    pub fn set(&mut self, key: impl Into<String>, value: SettingValue) -> Option<SettingValue> {
        self.0.insert(key.into(), value)
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, SettingValue::Bool(value));
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, SettingValue::Int(value));
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, SettingValue::String(value.into()));
    }

    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_stored_as_digit() {
        assert_eq!(SettingValue::Bool(true).to_text(), "1");
        assert_eq!(SettingValue::Bool(false).to_text(), "0");
        assert_eq!(
            SettingValue::parse(Some("bool"), "1").unwrap(),
            SettingValue::Bool(true)
        );
        assert_eq!(
            SettingValue::parse(Some("bool"), "7").unwrap(),
            SettingValue::Bool(true)
        );
    }

    #[test]
    fn test_missing_type_is_string() {
        assert_eq!(
            SettingValue::parse(None, " spaced ").unwrap(),
            SettingValue::String(" spaced ".into())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SettingValue::parse(Some("int"), "twelve"),
            Err(RosterError::InvalidSettingValue { kind: "int", .. })
        ));
        assert_eq!(
            SettingValue::parse(Some("float"), "1.5"),
            Err(RosterError::UnknownSettingType("float".into()))
        );
    }

    #[test]
    fn test_typed_accessors() {
        let mut settings = Settings::new();
        settings.set_bool("collapsed", true);
        settings.set_int("last_seen", 1_700_000_000);
        settings.set_string("note", "hi");

        assert_eq!(settings.get_bool("collapsed"), Some(true));
        assert_eq!(settings.get_int("last_seen"), Some(1_700_000_000));
        assert_eq!(settings.get_string("note"), Some("hi"));
        // wrong type reads as absent
        assert_eq!(settings.get_int("collapsed"), None);

        let keys: Vec<&str> = settings.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["collapsed", "last_seen", "note"]);

        assert!(settings.remove("note").is_some());
        assert_eq!(settings.len(), 2);
    }
}
