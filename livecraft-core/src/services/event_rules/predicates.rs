//! Built-in role and comparator predicates.

use livecraft_common::models::{EventData, EventKind, Rule};
use super::registry::RuleUpdate;

fn sender_roles(update: RuleUpdate) -> RuleUpdate {
    update
        .role("any", |_: &EventData| true)
        .role("sub", |e: &EventData| e.is_subscriber)
        .role("mod", |e: &EventData| e.is_moderator)
        .role("gifter", |e: &EventData| e.is_new_gifter)
}

fn comment(e: &EventData) -> Option<&str> {
    e.comment.as_deref()
}

/// `lessThan <= amount <= greaterThan`, bounds parsed as integers.
fn in_range(rule: &Rule, amount: Option<i64>) -> bool {
    let low = rule.less_than.as_ref().and_then(|o| o.as_integer());
    let high = rule.greater_than.as_ref().and_then(|o| o.as_integer());
    match (amount, low, high) {
        (Some(a), Some(lo), Some(hi)) => lo <= a && a <= hi,
        _ => false,
    }
}

fn equals_amount(rule: &Rule, amount: Option<i64>) -> bool {
    match (amount, rule.value.as_ref().and_then(|o| o.as_integer())) {
        (Some(a), Some(v)) => a == v,
        _ => false,
    }
}

fn chat() -> RuleUpdate {
    sender_roles(RuleUpdate::new())
        .comparator("any", |_: &Rule, _: &EventData| true)
        .comparator("equal", |r: &Rule, e: &EventData| {
            comment(e).is_some_and(|c| c == r.value_text())
        })
        .comparator("startsWith", |r: &Rule, e: &EventData| {
            comment(e).is_some_and(|c| c.starts_with(&r.value_text()))
        })
        .comparator("endsWith", |r: &Rule, e: &EventData| {
            comment(e).is_some_and(|c| c.ends_with(&r.value_text()))
        })
        .comparator("contains", |r: &Rule, e: &EventData| {
            comment(e).is_some_and(|c| c.contains(&r.value_text()))
        })
}

fn gift() -> RuleUpdate {
    sender_roles(RuleUpdate::new())
        .comparator("any", |_: &Rule, _: &EventData| true)
        .comparator("equal", |r: &Rule, e: &EventData| {
            e.gift_name.as_deref().is_some_and(|g| g == r.value_text())
        })
        .comparator("diamondCount", |r: &Rule, e: &EventData| {
            match (e.diamond_count, r.value.as_ref().and_then(|o| o.as_integer())) {
                (Some(count), Some(min)) => count >= min,
                _ => false,
            }
        })
}

fn bits() -> RuleUpdate {
    sender_roles(RuleUpdate::new())
        .comparator("any", |_: &Rule, _: &EventData| true)
        .comparator("equal", |r: &Rule, e: &EventData| equals_amount(r, e.bits_amount))
        .comparator("InRange", |r: &Rule, e: &EventData| in_range(r, e.bits_amount))
}

fn likes() -> RuleUpdate {
    sender_roles(RuleUpdate::new())
        .comparator("any", |_: &Rule, _: &EventData| true)
        .comparator("equal", |r: &Rule, e: &EventData| equals_amount(r, e.like_count))
        .comparator("InRange", |r: &Rule, e: &EventData| in_range(r, e.like_count))
}

pub fn defaults_for(kind: EventKind) -> RuleUpdate {
    match kind {
        EventKind::Chat => chat(),
        EventKind::Gift => gift(),
        EventKind::Bits => bits(),
        EventKind::Likes => likes(),
    }
}
