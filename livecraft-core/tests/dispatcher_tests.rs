// File: livecraft-core/tests/dispatcher_tests.rs

use std::sync::Arc;
use serde_json::json;

use livecraft_common::models::{Collection, FieldValidation, Rule};
use livecraft_core::{
    eventbus::{BusEvent, EventBus, Topic},
    repositories::CollectionStore,
    services::actions::{ActionDispatcher, DispatchReport},
    Database, Error,
};
use livecraft_core::test_utils::helpers::*;

async fn seed_actions(db: &Database) -> Result<(), Error> {
    let actions = db.collection(Collection::Actions, None);
    // 0: flat minecraft command
    actions
        .save_data(record(json!({
            "name": "diamond",
            "type": "Action",
            "minecraft_check": true,
            "minecraft_command": "/give @p diamond {diamondCount}"
        })))
        .await?;
    // 1: nested tts plus an overlay with check off
    actions
        .save_data(record(json!({
            "name": "thanks",
            "tts": {"check": true, "text": "thank you {user} for the {giftName}"},
            "overlay": {"check": false, "src": "x.gif"}
        })))
        .await?;
    // 2: overlay missing volume
    actions
        .save_data(record(json!({
            "name": "clip",
            "overlay": {"check": true, "src": "clip.webm", "content": "wow", "duration": 5}
        })))
        .await?;
    Ok(())
}

fn dispatcher(db: &Database, sink: &RecordingSink, tts: &RecordingTts) -> ActionDispatcher {
    ActionDispatcher::new(
        Arc::new(db.collection(Collection::Actions, None)),
        Arc::new(sink.clone()),
        Arc::new(tts.clone()),
    )
}

#[tokio::test]
async fn test_dangling_action_ids_are_omitted() -> Result<(), Error> {
    let db = setup_test_database().await?;
    seed_actions(&db).await?;
    let (sink, tts) = (RecordingSink::new(), RecordingTts::new());
    let d = dispatcher(&db, &sink, &tts);

    let rule = Rule::new("r", "any", "any").with_actions(vec![0, 77, 1000]);
    let resolved = d.resolve_actions(&rule).await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "diamond");

    let report = d.process_matched_items(&[rule], &gift_event("Ann", "Rose", 3)).await;
    assert_eq!(report, DispatchReport { dispatched: 1, skipped: 0, failed: 0 });
    Ok(())
}

#[tokio::test]
async fn test_envelope_carries_effect_and_event() -> Result<(), Error> {
    let db = setup_test_database().await?;
    seed_actions(&db).await?;
    let (sink, tts) = (RecordingSink::new(), RecordingTts::new());
    let d = dispatcher(&db, &sink, &tts);

    let rule = Rule::new("r", "any", "any").with_actions(vec![0]);
    d.process_matched_items(&[rule], &chat_event("Neo", "!diamond")).await;

    let emitted = sink.emitted.lock().clone();
    assert_eq!(emitted.len(), 1);
    let (name, payload) = &emitted[0];
    assert_eq!(name, "actions");
    assert_eq!(payload["type"], "minecraft");
    // socket commands go out as stored, only TTS text is templated
    assert_eq!(payload["data"]["command"], "/give @p diamond {diamondCount}");
    assert_eq!(payload["event"]["nickname"], "Neo");
    assert_eq!(payload["event"]["comment"], "!diamond");
    Ok(())
}

#[tokio::test]
async fn test_tts_for_gift_plays_now_with_template() -> Result<(), Error> {
    let db = setup_test_database().await?;
    seed_actions(&db).await?;
    let (sink, tts) = (RecordingSink::new(), RecordingTts::new());
    let d = dispatcher(&db, &sink, &tts);

    let rule = Rule::new("r", "any", "any").with_actions(vec![1]);
    let report = d.process_matched_items(&[rule.clone()], &gift_event("Ann", "Rose", 1)).await;
    assert_eq!(report.dispatched, 1);
    assert_eq!(tts.spoken(), vec![("thank you Ann for the Rose".to_string(), true)]);
    assert!(sink.payloads().is_empty(), "disabled overlay must not be emitted");

    // chat events queue instead of interrupting
    d.process_matched_items(&[rule], &chat_event("Bo", "hi")).await;
    assert_eq!(tts.spoken()[1].1, false);
    Ok(())
}

#[tokio::test]
async fn test_validation_modes() -> Result<(), Error> {
    let db = setup_test_database().await?;
    seed_actions(&db).await?;
    let rule = Rule::new("r", "any", "any").with_actions(vec![2]);
    let event = chat_event("Neo", "clip");

    let (sink, tts) = (RecordingSink::new(), RecordingTts::new());
    let strict = dispatcher(&db, &sink, &tts);
    let report = strict.process_matched_items(std::slice::from_ref(&rule), &event).await;
    assert_eq!(report, DispatchReport { dispatched: 0, skipped: 1, failed: 0 });
    assert!(sink.payloads().is_empty());

    let lenient = dispatcher(&db, &sink, &tts).with_validation(FieldValidation::Lenient);
    let report = lenient.process_matched_items(&[rule], &event).await;
    assert_eq!(report.dispatched, 1);
    assert_eq!(sink.payloads()[0]["type"], "overlay");
    Ok(())
}

#[tokio::test]
async fn test_every_matched_rule_dispatches_and_is_published() -> Result<(), Error> {
    let db = setup_test_database().await?;
    seed_actions(&db).await?;
    let bus = Arc::new(EventBus::new());
    let mut sub = bus.subscribe(Topic::named("actions"), None).await;
    let (sink, tts) = (RecordingSink::new(), RecordingTts::new());
    let d = dispatcher(&db, &sink, &tts).with_event_bus(bus.clone());

    let rules = vec![
        Rule::new("a", "any", "any").with_actions(vec![0]),
        Rule::new("b", "any", "any").with_actions(vec![0, 1]),
    ];
    let report = d.process_matched_items(&rules, &gift_event("Ann", "Lion", 500)).await;
    assert_eq!(report.dispatched, 3);
    assert_eq!(sink.payloads().len(), 2);
    assert_eq!(tts.spoken().len(), 1);

    let mut published = 0;
    while let Some(BusEvent::ActionEmitted(env)) = sub.try_recv() {
        assert_eq!(env.kind, "minecraft");
        published += 1;
    }
    assert_eq!(published, 2);
    Ok(())
}
