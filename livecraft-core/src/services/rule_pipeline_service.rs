use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::db::Database;
use crate::eventbus::{BusEvent, EventBus, Topic};
use crate::services::actions::{ActionDispatcher, DispatchReport};
use crate::services::event_rules::RuleEvaluator;
use livecraft_common::models::{EventKind, LiveEvent, Rule};

/// Runs every live event on the bus through its rule collection and
/// dispatches the actions of the rules that match.
pub struct RulePipelineService {
    db: Database,
    evaluator: RuleEvaluator,
    dispatcher: Arc<ActionDispatcher>,
    event_bus: Arc<EventBus>,
}

impl RulePipelineService {
    pub fn new(
        db: Database,
        evaluator: RuleEvaluator,
        dispatcher: Arc<ActionDispatcher>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self { db, evaluator, dispatcher, event_bus }
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    /// Rules stored for `kind`. A collection that cannot be read has no
    /// rules; records that do not decode as a rule are skipped.
    pub async fn load_rules(&self, kind: EventKind) -> Vec<Rule> {
        let config = kind.collection().config();
        self.db
            .get_all_data_from_database(&config)
            .await
            .into_iter()
            .filter_map(|record| {
                let id = record.get("id").cloned().unwrap_or(Value::Null);
                match serde_path_to_error::deserialize::<_, Rule>(Value::Object(record)) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        warn!("Skipping malformed rule {} in {}: {} at '{}'", id, config, e.inner(), e.path());
                        None
                    }
                }
            })
            .collect()
    }

    /// Evaluates one live event and dispatches the matches.
    pub async fn handle_event(&self, event: &LiveEvent) -> DispatchReport {
        let rules = self.load_rules(event.kind).await;
        let matched = self.evaluator.evaluate(event.kind, &rules, &event.data);
        debug!("{} event: {}/{} rule(s) matched", event.kind, matched.len(), rules.len());

        if matched.is_empty() {
            return DispatchReport::default();
        }
        self.dispatcher.process_matched_items(&matched, event).await
    }

    /// Listens on the bus until it shuts down. Each live event is handled
    /// in its own task.
    pub async fn start(self: Arc<Self>) {
        let mut sub = self.event_bus.subscribe(Topic::All, None).await;
        let mut shutdown_rx = self.event_bus.shutdown_rx.clone();
        info!("RulePipelineService started, listening on EventBus");

        loop {
            tokio::select! {
                maybe_event = sub.recv() => {
                    match maybe_event {
                        Some(BusEvent::Live(event)) => {
                            let service = self.clone();
                            tokio::spawn(async move {
                                service.handle_event(&event).await;
                            });
                        }
                        Some(other) => trace!("RulePipelineService ignoring '{}'", other.name()),
                        None => break,
                    }
                }
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("RulePipelineService shutting down.");
                        break;
                    }
                }
            }
        }
    }
}
