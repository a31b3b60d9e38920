// File: livecraft-common/src/models/action.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::models::lenient::literal_true;
use crate::models::rule::Operand;

/// Prefixes of the effect sub-objects an action record can carry.
pub const EFFECT_KINDS: [&str; 4] = ["minecraft", "tts", "overlay", "keypress"];


#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MinecraftAction {
    #[serde(default, deserialize_with = "literal_true")]
    pub check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TtsAction {
    #[serde(default, deserialize_with = "literal_true")]
    pub check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OverlayAction {
    #[serde(default, deserialize_with = "literal_true")]
    pub check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Operand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Operand>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct KeypressAction {
    #[serde(default, deserialize_with = "literal_true")]
    pub check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One enabled side effect of an action. Only a literal `check: true`
/// enables it.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEffect {
    Minecraft(MinecraftAction),
    Tts(TtsAction),
    Overlay(OverlayAction),
    Keypress(KeypressAction),
}

impl ActionEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionEffect::Minecraft(_) => "minecraft",
            ActionEffect::Tts(_) => "tts",
            ActionEffect::Overlay(_) => "overlay",
            ActionEffect::Keypress(_) => "keypress",
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ActionEffect::Minecraft(_) => &["command"],
            ActionEffect::Tts(_) => &["text"],
            ActionEffect::Overlay(_) => &["src", "content", "duration", "volume"],
            ActionEffect::Keypress(_) => &["key"],
        }
    }

    /// Required fields that are absent or null on this effect. Empty text
    /// and zero numbers count as present.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present: Vec<bool> = match self {
            ActionEffect::Minecraft(m) => vec![m.command.is_some()],
            ActionEffect::Tts(t) => vec![t.text.is_some()],
            ActionEffect::Overlay(o) => vec![
                o.src.is_some(),
                o.content.is_some(),
                o.duration.is_some(),
                o.volume.is_some(),
            ],
            ActionEffect::Keypress(k) => vec![k.key.is_some()],
        };
        self.required_fields()
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(field, _)| *field)
            .collect()
    }

    /// Fails with `Error::Validation` naming the missing fields.
    pub fn validate(&self) -> Result<(), Error> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "{} effect is missing {}",
                self.kind(),
                missing.join(", ")
            )))
        }
    }

    /// The sub-object as JSON, the `data` part of an emitted envelope.
    pub fn data_json(&self) -> Value {
        let v = match self {
            ActionEffect::Minecraft(m) => serde_json::to_value(m),
            ActionEffect::Tts(t) => serde_json::to_value(t),
            ActionEffect::Overlay(o) => serde_json::to_value(o),
            ActionEffect::Keypress(k) => serde_json::to_value(k),
        };
        v.unwrap_or(Value::Null)
    }
}

/// How strictly an enabled effect's fields are checked before dispatch.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldValidation {
    /// Every required field must be present and not null.
    #[default]
    Strict,
    /// `check == true` is enough.
    Lenient,
}

impl fmt::Display for FieldValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValidation::Strict => write!(f, "strict"),
            FieldValidation::Lenient => write!(f, "lenient"),
        }
    }
}

impl FromStr for FieldValidation {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(FieldValidation::Strict),
            "lenient" => Ok(FieldValidation::Lenient),
            _ => Err(Error::Parse(format!("Unknown field validation mode: {}", s))),
        }
    }
}

fn default_type_tag() -> String {
    "Action".to_string()
}

/// A stored bundle of side-effect configurations.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default = "default_type_tag")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft: Option<MinecraftAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypress: Option<KeypressAction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Action {
    /// Decodes a stored record, flat or nested. Effect entries that are not
    /// objects are ignored rather than failing the whole action.
    pub fn from_record(record: Map<String, Value>) -> Result<Self, Error> {
        let mut nested = unflatten_record(record);
        for kind in EFFECT_KINDS {
            if nested.get(kind).is_some_and(|v| !v.is_object()) {
                nested.remove(kind);
            }
        }
        Ok(serde_json::from_value(Value::Object(nested))?)
    }

    /// Effects whose `check` gate is on, in fixed kind order.
    pub fn effects(&self) -> Vec<ActionEffect> {
        let mut out = Vec::new();
        if let Some(m) = self.minecraft.as_ref().filter(|m| m.check) {
            out.push(ActionEffect::Minecraft(m.clone()));
        }
        if let Some(t) = self.tts.as_ref().filter(|t| t.check) {
            out.push(ActionEffect::Tts(t.clone()));
        }
        if let Some(o) = self.overlay.as_ref().filter(|o| o.check) {
            out.push(ActionEffect::Overlay(o.clone()));
        }
        if let Some(k) = self.keypress.as_ref().filter(|k| k.check) {
            out.push(ActionEffect::Keypress(k.clone()));
        }
        out
    }
}

/// Nests flat `<kind>_<field>` keys (as written by the action form) under
/// their effect object. Keys without a known effect prefix are kept as is.
pub fn unflatten_record(record: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut flat = Vec::new();

    for (key, value) in record {
        let split = key
            .split_once('_')
            .filter(|(prefix, rest)| !rest.is_empty() && EFFECT_KINDS.contains(prefix));
        match split {
            Some((prefix, rest)) => flat.push((prefix.to_string(), rest.to_string(), value)),
            None => {
                out.insert(key, value);
            }
        }
    }

    for (prefix, field, value) in flat {
        let entry = out
            .entry(prefix)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(obj) = entry {
            obj.entry(field).or_insert(value);
        }
    }
    out
}

/// Payload of an `"actions"` socket message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActionEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    pub event: Value,
}
