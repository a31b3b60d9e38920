// File: livecraft-common/src/models/rule.rs

use std::fmt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::models::collection::RecordId;
use crate::models::lenient::{not_literal_false, text_or_empty, truthy};

/// A comparator operand as entered in the rule form: text or a number.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Operand {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Operand {
    pub fn as_text(&self) -> String {
        match self {
            Operand::Integer(i) => i.to_string(),
            Operand::Float(f) => f.to_string(),
            Operand::Text(s) => s.clone(),
        }
    }

    /// Integer reading of the operand. Text is parsed from its leading
    /// digits, so `"25 coins"` reads as 25 and `"abc"` has no value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Operand::Integer(i) => Some(*i),
            Operand::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Operand::Float(_) => None,
            Operand::Text(s) => parse_leading_int(s),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Text(s.to_string())
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Operand::Integer(i)
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|v| v * sign)
}

/// A stored condition evaluated against incoming live events of one type.
/// Only `isActive: false` disables a rule. A role or comparator that is not
/// a string reads as empty and fails its registry lookup.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active", deserialize_with = "not_literal_false")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub role: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub comparator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Operand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than: Option<Operand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<Operand>,
    #[serde(default, deserialize_with = "truthy")]
    pub bypass_checks: bool,
    #[serde(default, deserialize_with = "deserialize_action_ids")]
    pub actions: Vec<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

// Ids may have been stored as strings by older forms; anything that does not
// coerce to a number can never reference an action and is dropped.
fn deserialize_action_ids<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(|v| RecordId::parse(v).ok())
        .map(|id| id.value())
        .collect())
}

impl Rule {
    pub fn new(name: &str, role: &str, comparator: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            is_active: true,
            role: role.to_string(),
            comparator: comparator.to_string(),
            value: None,
            less_than: None,
            greater_than: None,
            bypass_checks: false,
            actions: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_value(mut self, value: impl Into<Operand>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_range(mut self, less_than: impl Into<Operand>, greater_than: impl Into<Operand>) -> Self {
        self.less_than = Some(less_than.into());
        self.greater_than = Some(greater_than.into());
        self
    }

    pub fn with_actions(mut self, actions: Vec<u64>) -> Self {
        self.actions = actions;
        self
    }

    pub fn bypassing_checks(mut self) -> Self {
        self.bypass_checks = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn value_text(&self) -> String {
        self.value.as_ref().map(Operand::as_text).unwrap_or_default()
    }
}
