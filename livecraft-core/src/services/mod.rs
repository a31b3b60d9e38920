// File: src/services/mod.rs

pub mod event_rules;
pub mod actions;
pub mod rule_pipeline_service;

pub use actions::{ActionDispatcher, DispatchReport};
pub use event_rules::{RuleEvaluator, RuleRegistry, RuleUpdate};
pub use rule_pipeline_service::RulePipelineService;
