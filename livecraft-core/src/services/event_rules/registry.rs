use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::info;

use livecraft_common::models::{EventData, EventKind, Rule};
use super::predicates;

/// Tests the sender of an event (subscriber, moderator, ...).
pub type RolePredicate = Arc<dyn Fn(&EventData) -> bool + Send + Sync>;

/// Compares a rule's operands against a field of the event.
pub type ComparatorPredicate = Arc<dyn Fn(&Rule, &EventData) -> bool + Send + Sync>;

/// Named predicates available to rules of one event type.
#[derive(Clone, Default)]
pub struct PredicateTable {
    roles: HashMap<String, RolePredicate>,
    comparators: HashMap<String, ComparatorPredicate>,
}

impl PredicateTable {
    pub fn role(&self, name: &str) -> Option<RolePredicate> {
        self.roles.get(name).cloned()
    }

    pub fn comparator(&self, name: &str) -> Option<ComparatorPredicate> {
        self.comparators.get(name).cloned()
    }

    fn merge(&mut self, update: RuleUpdate) {
        self.roles.extend(update.roles);
        self.comparators.extend(update.comparators);
    }
}

/// A batch of predicates to merge into one event type's table. Entries
/// replace existing predicates of the same name.
#[derive(Clone, Default)]
pub struct RuleUpdate {
    pub roles: HashMap<String, RolePredicate>,
    pub comparators: HashMap<String, ComparatorPredicate>,
}

impl RuleUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&EventData) -> bool + Send + Sync + 'static,
    {
        self.roles.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn comparator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Rule, &EventData) -> bool + Send + Sync + 'static,
    {
        self.comparators.insert(name.to_string(), Arc::new(f));
        self
    }
}

/// Role and comparator tables per event type.
///
/// The registry is shared by reference; predicates can be added while the
/// pipeline is running and apply from the next evaluated event on.
#[derive(Default)]
pub struct RuleRegistry {
    tables: RwLock<HashMap<EventKind, PredicateTable>>,
}

impl RuleRegistry {
    /// A registry with no predicates at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in tables for chat, gift, bits and likes.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        for kind in EventKind::ALL {
            registry.update_rules(kind, predicates::defaults_for(kind));
        }
        registry
    }

    pub fn register_role<F>(&self, kind: EventKind, name: &str, f: F)
    where
        F: Fn(&EventData) -> bool + Send + Sync + 'static,
    {
        self.update_rules(kind, RuleUpdate::new().role(name, f));
    }

    pub fn register_comparator<F>(&self, kind: EventKind, name: &str, f: F)
    where
        F: Fn(&Rule, &EventData) -> bool + Send + Sync + 'static,
    {
        self.update_rules(kind, RuleUpdate::new().comparator(name, f));
    }

    /// Merges `update` into the table for `kind`.
    pub fn update_rules(&self, kind: EventKind, update: RuleUpdate) {
        if !update.roles.is_empty() || !update.comparators.is_empty() {
            info!(
                "Registering predicates for {}: roles={:?} comparators={:?}",
                kind,
                update.roles.keys().collect::<Vec<_>>(),
                update.comparators.keys().collect::<Vec<_>>()
            );
        }
        self.tables.write().entry(kind).or_default().merge(update);
    }

    pub fn role(&self, kind: EventKind, name: &str) -> Option<RolePredicate> {
        self.tables.read().get(&kind).and_then(|t| t.role(name))
    }

    pub fn comparator(&self, kind: EventKind, name: &str) -> Option<ComparatorPredicate> {
        self.tables.read().get(&kind).and_then(|t| t.comparator(name))
    }

    /// Snapshot of one event type's table.
    pub fn table(&self, kind: EventKind) -> PredicateTable {
        self.tables.read().get(&kind).cloned().unwrap_or_default()
    }

    pub fn role_names(&self, kind: EventKind) -> Vec<String> {
        let mut names: Vec<String> = self.table(kind).roles.into_keys().collect();
        names.sort();
        names
    }

    pub fn comparator_names(&self, kind: EventKind) -> Vec<String> {
        let mut names: Vec<String> = self.table(kind).comparators.into_keys().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_kind() {
        let registry = RuleRegistry::with_defaults();
        assert_eq!(registry.role_names(EventKind::Gift), vec!["any", "gifter", "mod", "sub"]);
        assert_eq!(
            registry.comparator_names(EventKind::Chat),
            vec!["any", "contains", "endsWith", "equal", "startsWith"]
        );
        assert_eq!(registry.comparator_names(EventKind::Bits), vec!["InRange", "any", "equal"]);
        assert_eq!(registry.comparator_names(EventKind::Gift), vec!["any", "diamondCount", "equal"]);
    }

    #[test]
    fn update_rules_merges_and_overrides() {
        let registry = RuleRegistry::with_defaults();
        registry.update_rules(
            EventKind::Chat,
            RuleUpdate::new()
                .role("vip", |e: &EventData| e.extra.get("isVip").and_then(|v| v.as_bool()).unwrap_or(false))
                .comparator("any", |_: &Rule, _: &EventData| false),
        );

        assert!(registry.role(EventKind::Chat, "vip").is_some());
        assert!(registry.role(EventKind::Chat, "mod").is_some());
        let any = registry.comparator(EventKind::Chat, "any").unwrap();
        assert!(!any(&Rule::new("r", "any", "any"), &EventData::default()));
        // other kinds keep their own table
        assert!(registry.role(EventKind::Gift, "vip").is_none());
    }
}
