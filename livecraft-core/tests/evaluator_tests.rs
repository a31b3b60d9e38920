// File: livecraft-core/tests/evaluator_tests.rs

use std::sync::Arc;

use livecraft_common::models::{EventData, EventKind, Rule};
use livecraft_core::services::event_rules::{RuleEvaluator, RuleRegistry, RuleUpdate};

fn evaluator() -> RuleEvaluator {
    RuleEvaluator::new(Arc::new(RuleRegistry::with_defaults()))
}

fn comment(text: &str) -> EventData {
    EventData {
        nickname: "viewer".into(),
        comment: Some(text.into()),
        ..Default::default()
    }
}

fn bits(amount: i64) -> EventData {
    EventData { bits_amount: Some(amount), ..Default::default() }
}

#[test]
fn test_inactive_rules_never_match() {
    let ev = evaluator();
    let rules = vec![
        Rule::new("plain", "any", "any").inactive(),
        Rule::new("bypass", "any", "any").bypassing_checks().inactive(),
        Rule::new("bogus", "nope", "nope").inactive(),
    ];
    for kind in EventKind::ALL {
        assert!(ev.evaluate(kind, &rules, &comment("hi")).is_empty(), "{kind} matched an inactive rule");
    }
}

#[test]
fn test_bypass_ignores_role_and_comparator() {
    let ev = evaluator();
    let rule = Rule::new("always", "no-such-role", "no-such-comparator").bypassing_checks();
    for kind in EventKind::ALL {
        let matched = ev.evaluate(kind, std::slice::from_ref(&rule), &EventData::default());
        assert_eq!(matched.len(), 1);
    }
    // without the bypass the unknown names fail the rule
    let strict = Rule::new("never", "no-such-role", "any");
    assert!(ev.evaluate(EventKind::Chat, &[strict], &comment("x")).is_empty());
}

#[test]
fn test_starts_with_command() {
    let ev = evaluator();
    let rule = Rule::new("cmd", "any", "startsWith").with_value("!cmd");
    assert!(ev.matches(EventKind::Chat, &rule, &comment("!cmd now")));
    assert!(!ev.matches(EventKind::Chat, &rule, &comment("now !cmd")));
}

#[test]
fn test_chat_text_comparators() {
    let ev = evaluator();
    let ends = Rule::new("ends", "any", "endsWith").with_value("please");
    let has = Rule::new("has", "any", "contains").with_value("creeper");
    let eq = Rule::new("eq", "any", "equal").with_value("gg");

    assert!(ev.matches(EventKind::Chat, &ends, &comment("tp me please")));
    assert!(ev.matches(EventKind::Chat, &has, &comment("spawn a creeper!")));
    assert!(ev.matches(EventKind::Chat, &eq, &comment("gg")));
    assert!(!ev.matches(EventKind::Chat, &eq, &comment("gg wp")));
}

#[test]
fn test_bits_range_is_inclusive() {
    let ev = evaluator();
    let rule = Rule::new("range", "any", "InRange").with_range(10i64, 50i64);
    for amount in [10, 30, 50] {
        assert!(ev.matches(EventKind::Bits, &rule, &bits(amount)), "{amount} should match");
    }
    for amount in [9, 51] {
        assert!(!ev.matches(EventKind::Bits, &rule, &bits(amount)), "{amount} should not match");
    }
    // string bounds as stored by the form
    let rule = Rule::new("range", "any", "InRange").with_range("10", "50");
    assert!(ev.matches(EventKind::Bits, &rule, &bits(50)));
}

#[test]
fn test_roles_gate_the_sender() {
    let ev = evaluator();
    let subs = Rule::new("subs", "sub", "any");
    let gifters = Rule::new("gifters", "gifter", "any");
    let data = EventData { is_subscriber: true, ..Default::default() };

    assert!(ev.matches(EventKind::Gift, &subs, &data));
    assert!(!ev.matches(EventKind::Gift, &gifters, &data));
}

#[test]
fn test_registered_predicates_apply_immediately() {
    let registry = Arc::new(RuleRegistry::with_defaults());
    let ev = RuleEvaluator::new(registry.clone());
    let rule = Rule::new("whales", "any", "atLeast").with_value(1000i64);

    assert!(!ev.matches(EventKind::Bits, &rule, &bits(5000)));

    registry.update_rules(
        EventKind::Bits,
        RuleUpdate::new().comparator("atLeast", |r: &Rule, e: &EventData| {
            match (e.bits_amount, r.value.as_ref().and_then(|v| v.as_integer())) {
                (Some(a), Some(min)) => a >= min,
                _ => false,
            }
        }),
    );
    assert!(ev.matches(EventKind::Bits, &rule, &bits(5000)));
    assert!(!ev.matches(EventKind::Bits, &rule, &bits(10)));
}

#[test]
fn test_evaluate_keeps_input_order() {
    let ev = evaluator();
    let rules = vec![
        Rule::new("second", "any", "contains").with_value("a").with_id(2),
        Rule::new("skip", "mod", "any").with_id(3),
        Rule::new("first", "any", "any").with_id(1),
    ];
    let names: Vec<String> = ev
        .evaluate(EventKind::Chat, &rules, &comment("abc"))
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["second", "first"]);
}

#[test]
fn test_stored_rule_shapes_decode_before_evaluation() {
    let ev = evaluator();
    let decode = |v: serde_json::Value| -> Rule { serde_json::from_value(v).expect("rule decodes") };

    let bypass = decode(serde_json::json!({"bypassChecks": true, "role": null, "comparator": null}));
    let unset_active = decode(serde_json::json!({"isActive": null, "role": "any", "comparator": "any"}));
    let null_role = decode(serde_json::json!({"role": null, "comparator": "any"}));
    let off = decode(serde_json::json!({"isActive": false, "bypassChecks": true}));

    let matched = ev.evaluate(
        EventKind::Chat,
        &[bypass, unset_active, null_role, off],
        &comment("hello"),
    );
    assert_eq!(matched.len(), 2);
    assert!(matched[0].bypass_checks);
    assert_eq!(matched[1].role, "any");
}
