pub mod registry;
pub mod predicates;
pub mod evaluator;

pub use registry::{ComparatorPredicate, PredicateTable, RolePredicate, RuleRegistry, RuleUpdate};
pub use evaluator::RuleEvaluator;
