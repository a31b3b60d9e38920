use std::collections::HashMap;
use serde_json::Value;

use livecraft_common::models::LiveEvent;

/// Placeholder values for an event: its top-level scalar fields, plus
/// `{user}` (nickname, else uniqueId) and `{eventType}`.
pub fn template_vars(event: &LiveEvent) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    if let Value::Object(map) = event.data_json() {
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            vars.insert(key, text);
        }
    }

    let user = if event.data.nickname.is_empty() {
        event.data.unique_id.clone()
    } else {
        event.data.nickname.clone()
    };
    vars.entry("user".to_string()).or_insert(user);
    vars.insert("eventType".to_string(), event.kind.as_str().to_string());
    vars
}

/// Replaces `{field}` placeholders with values from the event. Unknown
/// placeholders are left as written.
pub fn render_template(template: &str, event: &LiveEvent) -> String {
    let vars = template_vars(event);
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => match vars.get(&after[..end]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecraft_common::models::{EventData, EventKind};

    fn gift_event() -> LiveEvent {
        LiveEvent::new(
            EventKind::Gift,
            EventData {
                unique_id: "alice01".into(),
                nickname: "Alice".into(),
                gift_name: Some("Rose".into()),
                diamond_count: Some(5),
                ..Default::default()
            },
        )
    }

    #[test]
    fn substitutes_event_fields() {
        let text = render_template("{nickname} ({uniqueId}) sent {diamondCount}x {giftName}", &gift_event());
        assert_eq!(text, "Alice (alice01) sent 5x Rose");
    }

    #[test]
    fn user_alias_falls_back_to_unique_id() {
        let mut ev = gift_event();
        assert_eq!(render_template("thanks {user}", &ev), "thanks Alice");
        ev.data.nickname.clear();
        assert_eq!(render_template("thanks {user}", &ev), "thanks alice01");
    }

    #[test]
    fn unknown_and_unterminated_placeholders_stay() {
        let ev = gift_event();
        assert_eq!(render_template("{nope} {giftName} {", &ev), "{nope} Rose {");
        assert_eq!(render_template("{{giftName}}", &ev), "{Rose}");
    }
}
