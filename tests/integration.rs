//! Integration tests - feed scripted bars through the full pipeline

#[path = "integration/engine.rs"]
mod engine;
