//! Per-agent key/value store shared by behavior tree nodes

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{ItemId, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum BlackboardValue {
    Int(i64),
    Float(f64),
    Text(String),
    Position(Position),
    Item(ItemId),
}

impl fmt::Display for BlackboardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlackboardValue::Int(v) => write!(f, "{}", v),
            BlackboardValue::Float(v) => write!(f, "{}", v),
            BlackboardValue::Text(v) => write!(f, "{}", v),
            BlackboardValue::Position(p) => write!(f, "{}", p),
            BlackboardValue::Item(id) => write!(f, "{}", id.0),
        }
    }
}

impl From<&str> for BlackboardValue {
    fn from(v: &str) -> Self {
        BlackboardValue::Text(v.to_string())
    }
}

impl From<String> for BlackboardValue {
    fn from(v: String) -> Self {
        BlackboardValue::Text(v)
    }
}

impl From<i64> for BlackboardValue {
    fn from(v: i64) -> Self {
        BlackboardValue::Int(v)
    }
}

impl From<f64> for BlackboardValue {
    fn from(v: f64) -> Self {
        BlackboardValue::Float(v)
    }
}

impl From<Position> for BlackboardValue {
    fn from(v: Position) -> Self {
        BlackboardValue::Position(v)
    }
}

impl From<ItemId> for BlackboardValue {
    fn from(v: ItemId) -> Self {
        BlackboardValue::Item(v)
    }
}

/// Typed blackboard
///
/// Ordered by key so snapshots serialize identically between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    entries: BTreeMap<String, BlackboardValue>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<BlackboardValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&BlackboardValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<BlackboardValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(BlackboardValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn item(&self, key: &str) -> Option<ItemId> {
        match self.entries.get(key) {
            Some(BlackboardValue::Item(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn position(&self, key: &str) -> Option<Position> {
        match self.entries.get(key) {
            Some(BlackboardValue::Position(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(BlackboardValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// String comparison used by blackboard preconditions.
    ///
    /// `"*"` matches any value, including a missing key. A missing key
    /// renders as the empty string.
    pub fn matches(&self, key: &str, expected: &str) -> bool {
        if expected == "*" {
            return true;
        }
        match self.entries.get(key) {
            Some(value) => value.to_string() == expected,
            None => expected.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BlackboardValue)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads() {
        let mut bb = Blackboard::new();
        bb.insert("JobType", "Dig");
        bb.insert("ClaimedTool", ItemId(4));
        bb.insert("Target", Position::new(1, 2, 0));

        assert_eq!(bb.text("JobType"), Some("Dig"));
        assert_eq!(bb.item("ClaimedTool"), Some(ItemId(4)));
        assert_eq!(bb.position("Target"), Some(Position::new(1, 2, 0)));
        // wrong type reads as absent
        assert_eq!(bb.item("JobType"), None);
    }

    #[test]
    fn test_matches() {
        let mut bb = Blackboard::new();
        bb.insert("JobFlow", "Haul");
        assert!(bb.matches("JobFlow", "Haul"));
        assert!(!bb.matches("JobFlow", "Standard"));
        assert!(bb.matches("JobFlow", "*"));
        assert!(bb.matches("Missing", "*"));
        assert!(!bb.matches("Missing", "Haul"));
    }

    #[test]
    fn test_remove() {
        let mut bb = Blackboard::new();
        bb.insert("Count", 3i64);
        assert_eq!(bb.int("Count"), Some(3));
        assert!(bb.remove("Count").is_some());
        assert!(bb.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut bb = Blackboard::new();
        bb.insert("JobType", "Craft");
        bb.insert("ClaimedInventoryItem", ItemId(9));
        let json = serde_json::to_string(&bb).unwrap();
        let restored: Blackboard = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, bb);
    }
}
