// File: livecraft-common/src/models/mod.rs
pub mod collection;
pub mod rule;
pub mod action;
pub mod live_event;
mod lenient;

pub use collection::{Collection, CollectionConfig, RecordId, StoreNotification, StoreOp};
pub use rule::{Operand, Rule};
pub use action::{
    unflatten_record, Action, ActionEffect, ActionEnvelope, FieldValidation, KeypressAction,
    MinecraftAction, OverlayAction, TtsAction,
};
pub use live_event::{EventData, EventKind, LiveEvent, LiveFrame};
