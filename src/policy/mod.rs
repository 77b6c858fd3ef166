pub mod engine;
pub mod rules;

pub use engine::PolicyEngine;
pub use rules::{default_rules, PolicyRule, RuleAction, PROTECTED_SYSTEM_PATHS};
