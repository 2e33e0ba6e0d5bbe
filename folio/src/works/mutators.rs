//! Document mutators applied to every outgoing work.

use serde_json::{json, Value};

use crate::response::DocumentMutator;

/// JSON-LD context injected into every outgoing work document.
pub const WORK_CONTEXT: &str = "https://api.foliosearch.org/contexts/work.json";

/// Gives every outgoing document its JSON-LD context.
pub struct ContextMutator;

impl DocumentMutator for ContextMutator {
    fn apply(&self, mut hit: Value) -> Vec<Value> {
        if let Some(obj) = hit.as_object_mut() {
            obj.insert("@context".to_string(), json!(WORK_CONTEXT));
        }
        vec![hit]
    }
}

/// Strips index plumbing callers should never see.
pub struct StripInternalFields;

impl DocumentMutator for StripInternalFields {
    fn apply(&self, mut hit: Value) -> Vec<Value> {
        if let Some(obj) = hit.as_object_mut() {
            obj.remove("joinField");
        }
        vec![hit]
    }
}

/// The works mutator chain, applied in order.
pub fn all() -> Vec<Box<dyn DocumentMutator>> {
    vec![Box::new(StripInternalFields), Box::new(ContextMutator)]
}
