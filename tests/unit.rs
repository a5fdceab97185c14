//! Unit tests - organized by module structure

#[path = "unit/evaluators/strength_sequence.rs"]
mod evaluators_strength_sequence;

#[path = "unit/models/alert_validation.rs"]
mod models_alert_validation;
