use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use livecraft_common::models::{EventData, EventKind, Rule};
use super::registry::RuleRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RuleKey {
    Id(u64),
    Position(usize),
}

/// Matches stored rules against live events using the registry's predicates.
#[derive(Clone)]
pub struct RuleEvaluator {
    registry: Arc<RuleRegistry>,
}

impl RuleEvaluator {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Every rule in `rules` that matches `event`, in input order. A rule id
    /// seen twice is only returned once; rules without an id are keyed by
    /// position.
    pub fn evaluate(&self, kind: EventKind, rules: &[Rule], event: &EventData) -> Vec<Rule> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            if !self.matches(kind, rule, event) {
                continue;
            }
            let key = rule.id.map(RuleKey::Id).unwrap_or(RuleKey::Position(index));
            if seen.insert(key) {
                matched.push(rule.clone());
            }
        }
        matched
    }

    pub fn matches(&self, kind: EventKind, rule: &Rule, event: &EventData) -> bool {
        if !rule.is_active {
            return false;
        }
        if rule.bypass_checks {
            return true;
        }

        let Some(role_check) = self.registry.role(kind, &rule.role) else {
            debug!("Rule '{}': unknown {} role '{}'", rule.name, kind, rule.role);
            return false;
        };
        if !role_check(event) {
            return false;
        }

        let Some(comparator_check) = self.registry.comparator(kind, &rule.comparator) else {
            debug!("Rule '{}': unknown {} comparator '{}'", rule.name, kind, rule.comparator);
            return false;
        };
        comparator_check(rule, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> RuleEvaluator {
        RuleEvaluator::new(Arc::new(RuleRegistry::with_defaults()))
    }

    #[test]
    fn duplicate_ids_are_returned_once() {
        let rules = vec![
            Rule::new("a", "any", "any").with_id(4),
            Rule::new("a again", "any", "any").with_id(4),
            Rule::new("no id", "any", "any"),
            Rule::new("no id either", "any", "any"),
        ];
        let matched = evaluator().evaluate(EventKind::Chat, &rules, &EventData::default());
        let names: Vec<_> = matched.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "no id", "no id either"]);
    }

    #[test]
    fn role_is_checked_before_comparator() {
        let rule = Rule::new("mods", "mod", "any");
        let ev = evaluator();
        assert!(!ev.matches(EventKind::Chat, &rule, &EventData::default()));
        let data = EventData { is_moderator: true, ..Default::default() };
        assert!(ev.matches(EventKind::Chat, &rule, &data));
    }
}
