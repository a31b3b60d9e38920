use std::sync::Arc;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::Error;
use crate::eventbus::{BusEvent, EventBus};
use livecraft_common::models::{
    Action, ActionEffect, ActionEnvelope, FieldValidation, LiveEvent, Rule,
};
use livecraft_common::traits::{ActionSink, CollectionStore, TtsPlayer};
use super::template::render_template;

/// Outcome counts of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Effects that reached the socket or the TTS player.
    pub dispatched: usize,
    /// Effects that were enabled but not run (validation, emotes).
    pub skipped: usize,
    /// Effects whose callback returned an error.
    pub failed: usize,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.dispatched += other.dispatched;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

enum EffectOutcome {
    Dispatched,
    Skipped,
}

/// Turns matched rules into side effects.
pub struct ActionDispatcher {
    actions: Arc<dyn CollectionStore>,
    sink: Arc<dyn ActionSink>,
    tts: Arc<dyn TtsPlayer>,
    event_bus: Option<Arc<EventBus>>,
    validation: FieldValidation,
}

impl ActionDispatcher {
    pub fn new(
        actions: Arc<dyn CollectionStore>,
        sink: Arc<dyn ActionSink>,
        tts: Arc<dyn TtsPlayer>,
    ) -> Self {
        Self {
            actions,
            sink,
            tts,
            event_bus: None,
            validation: FieldValidation::default(),
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = validation;
        self
    }

    /// The Action records a rule references. Ids with no record behind them
    /// are dropped silently, undecodable records with a warning.
    pub async fn resolve_actions(&self, rule: &Rule) -> Result<Vec<Action>, Error> {
        if rule.actions.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.actions.filter_items_by_ids(&rule.actions).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match Action::from_record(record) {
                Ok(action) => Some(action),
                Err(e) => {
                    warn!("Rule '{}': skipping undecodable action: {}", rule.name, e);
                    None
                }
            })
            .collect())
    }

    /// Dispatches the actions of every matched rule. Rules are handled
    /// concurrently, so effects of different rules may interleave.
    pub async fn process_matched_items(&self, rules: &[Rule], event: &LiveEvent) -> DispatchReport {
        let pass_id = Uuid::new_v4();
        debug!("Dispatch {}: {} matched {} rule(s)", pass_id, event.kind, rules.len());

        let reports = join_all(rules.iter().map(|rule| self.dispatch_rule(rule, event))).await;

        let mut total = DispatchReport::default();
        for report in reports {
            total.merge(report);
        }
        info!(
            "Dispatch {}: dispatched={} skipped={} failed={}",
            pass_id, total.dispatched, total.skipped, total.failed
        );
        total
    }

    async fn dispatch_rule(&self, rule: &Rule, event: &LiveEvent) -> DispatchReport {
        let actions = match self.resolve_actions(rule).await {
            Ok(actions) => actions,
            Err(e) => {
                error!("Rule '{}': failed to load actions: {:?}", rule.name, e);
                return DispatchReport { failed: 1, ..Default::default() };
            }
        };

        let mut report = DispatchReport::default();
        for action in &actions {
            report.merge(self.dispatch_action(action, event).await);
        }
        report
    }

    /// Runs every enabled effect of one action.
    pub async fn dispatch_action(&self, action: &Action, event: &LiveEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for effect in action.effects() {
            if self.validation == FieldValidation::Strict {
                if let Err(e) = effect.validate() {
                    warn!("Action '{}': {}, not dispatching", action.name, e);
                    report.skipped += 1;
                    continue;
                }
            }

            match self.run_effect(&effect, action, event).await {
                Ok(EffectOutcome::Dispatched) => report.dispatched += 1,
                Ok(EffectOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!("Action '{}': {} effect failed: {:?}", action.name, effect.kind(), e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn run_effect(
        &self,
        effect: &ActionEffect,
        action: &Action,
        event: &LiveEvent,
    ) -> Result<EffectOutcome, Error> {
        match effect {
            ActionEffect::Tts(tts) => {
                if event.has_emotes() {
                    debug!("Action '{}': event carries emotes, skipping TTS", action.name);
                    return Ok(EffectOutcome::Skipped);
                }
                let text = render_template(tts.text.as_deref().unwrap_or_default(), event);
                self.tts.speak(&text, event.is_gift_related()).await?;
                Ok(EffectOutcome::Dispatched)
            }
            ActionEffect::Minecraft(_) | ActionEffect::Overlay(_) | ActionEffect::Keypress(_) => {
                let envelope = ActionEnvelope {
                    kind: effect.kind().to_string(),
                    data: effect.data_json(),
                    event: event.data_json(),
                };
                self.sink.emit("actions", serde_json::to_value(&envelope)?).await?;
                if let Some(bus) = &self.event_bus {
                    bus.publish(BusEvent::ActionEmitted(envelope)).await;
                }
                Ok(EffectOutcome::Dispatched)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::*;
    use serde_json::{json, Map, Value};
    use livecraft_common::models::{CollectionConfig, EventData, EventKind, RecordId, TtsAction};
    use livecraft_common::traits::store_traits::Record;

    mock! {
        Sink {}
        #[async_trait]
        impl ActionSink for Sink {
            async fn emit(&self, event: &str, payload: Value) -> Result<(), Error>;
        }
    }

    mock! {
        Tts {}
        #[async_trait]
        impl TtsPlayer for Tts {
            async fn speak(&self, text: &str, play_now: bool) -> Result<(), Error>;
        }
    }

    /// Read-only store over a fixed list of records.
    struct FixedStore {
        config: CollectionConfig,
        records: Vec<Record>,
    }

    #[async_trait]
    impl CollectionStore for FixedStore {
        fn config(&self) -> &CollectionConfig {
            &self.config
        }
        async fn save_data(&self, record: Record) -> Result<Record, Error> {
            Ok(record)
        }
        async fn delete_data(&self, _id: RecordId) -> Result<(), Error> {
            Ok(())
        }
        async fn get_all_data(&self) -> Result<Vec<Record>, Error> {
            Ok(self.records.clone())
        }
        async fn get_data_by_id(&self, id: RecordId) -> Result<Record, Error> {
            Err(Error::NotFound(id.to_string()))
        }
        async fn update_data_by_id(&self, id: RecordId, _patch: Record) -> Result<Record, Error> {
            Err(Error::NotFound(id.to_string()))
        }
        async fn clear_database(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    fn store(records: Vec<Value>) -> Arc<dyn CollectionStore> {
        Arc::new(FixedStore {
            config: CollectionConfig { database_name: "Actions".into(), store_name: "Actions".into() },
            records: records.into_iter().map(|v| v.as_object().cloned().unwrap_or_else(Map::new)).collect(),
        })
    }

    fn chat(comment: &str) -> LiveEvent {
        LiveEvent::new(
            EventKind::Chat,
            EventData { nickname: "Bob".into(), comment: Some(comment.into()), ..Default::default() },
        )
    }

    #[tokio::test]
    async fn minecraft_effect_is_emitted_on_the_socket() {
        let mut sink = MockSink::new();
        sink.expect_emit()
            .with(eq("actions"), function(|p: &Value| {
                p["type"] == "minecraft" && p["data"]["command"] == "/give @p diamond" && p["event"]["comment"] == "!d"
            }))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut tts = MockTts::new();
        tts.expect_speak().never();

        let actions = store(vec![json!({"id": 0, "name": "d", "minecraft_check": true, "minecraft_command": "/give @p diamond"})]);
        let dispatcher = ActionDispatcher::new(actions, Arc::new(sink), Arc::new(tts));

        let rule = Rule::new("r", "any", "any").with_actions(vec![0]);
        let report = dispatcher.process_matched_items(&[rule], &chat("!d")).await;
        assert_eq!(report, DispatchReport { dispatched: 1, skipped: 0, failed: 0 });
    }

    #[tokio::test]
    async fn tts_is_skipped_for_events_with_emotes() {
        let sink = MockSink::new();
        let mut tts = MockTts::new();
        tts.expect_speak().never();
        let dispatcher = ActionDispatcher::new(store(vec![]), Arc::new(sink), Arc::new(tts));

        let action = Action::from_record(
            json!({"name": "say", "tts": {"check": true, "text": "hi {user}"}}).as_object().cloned().unwrap(),
        )
        .unwrap();
        let mut event = chat("hello");
        event.data.emotes = vec![json!({"emoteId": "1"})];

        let report = dispatcher.dispatch_action(&action, &event).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.dispatched, 0);
    }

    #[tokio::test]
    async fn tts_plays_immediately_for_gifts() {
        let sink = MockSink::new();
        let mut tts = MockTts::new();
        tts.expect_speak()
            .with(eq("thanks Bob for Rose"), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));
        let dispatcher = ActionDispatcher::new(store(vec![]), Arc::new(sink), Arc::new(tts));

        let mut action = Action::from_record(Map::new()).unwrap();
        action.name = "thanks".into();
        action.tts = Some(TtsAction { check: true, text: Some("thanks {user} for {giftName}".into()), ..Default::default() });
        let event = LiveEvent::new(
            EventKind::Gift,
            EventData { nickname: "Bob".into(), gift_name: Some("Rose".into()), ..Default::default() },
        );

        assert_eq!(dispatcher.dispatch_action(&action, &event).await.dispatched, 1);
    }

    #[tokio::test]
    async fn strict_validation_holds_back_incomplete_effects() {
        let action = Action::from_record(
            json!({"name": "half", "overlay": {"check": true, "src": "a.gif"}}).as_object().cloned().unwrap(),
        )
        .unwrap();

        let mut sink = MockSink::new();
        sink.expect_emit().never();
        let strict = ActionDispatcher::new(store(vec![]), Arc::new(sink), Arc::new(MockTts::new()));
        assert_eq!(strict.dispatch_action(&action, &chat("x")).await.skipped, 1);

        let mut sink = MockSink::new();
        sink.expect_emit().times(1).returning(|_, _| Ok(()));
        let lenient = ActionDispatcher::new(store(vec![]), Arc::new(sink), Arc::new(MockTts::new()))
            .with_validation(FieldValidation::Lenient);
        assert_eq!(lenient.dispatch_action(&action, &chat("x")).await.dispatched, 1);
    }

    #[tokio::test]
    async fn strict_validation_accepts_zero_volume_overlay() {
        let action = Action::from_record(
            json!({"name": "quiet", "overlay": {"check": true, "src": "a.gif", "content": "hi", "duration": 5, "volume": 0}})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .unwrap();

        let mut sink = MockSink::new();
        sink.expect_emit()
            .withf(|_, p: &Value| p["data"]["volume"] == 0 && p["data"]["duration"] == 5)
            .times(1)
            .returning(|_, _| Ok(()));
        let dispatcher = ActionDispatcher::new(store(vec![]), Arc::new(sink), Arc::new(MockTts::new()));
        let report = dispatcher.dispatch_action(&action, &chat("x")).await;
        assert_eq!(report, DispatchReport { dispatched: 1, skipped: 0, failed: 0 });
    }

    #[tokio::test]
    async fn sink_errors_are_counted_not_propagated() {
        let mut sink = MockSink::new();
        sink.expect_emit().returning(|_, _| Err(Error::WebSocket("closed".into())));
        let dispatcher = ActionDispatcher::new(store(vec![]), Arc::new(sink), Arc::new(MockTts::new()));

        let action = Action::from_record(
            json!({"name": "k", "keypress": {"check": true, "key": "F5"}}).as_object().cloned().unwrap(),
        )
        .unwrap();
        assert_eq!(dispatcher.dispatch_action(&action, &chat("x")).await.failed, 1);
    }
}
