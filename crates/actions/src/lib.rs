//! `actions` crate — the built-in `ActionHandler` implementations.
//!
//! The engine dispatches through the [`engine::ActionHandler`] trait and
//! knows nothing about what a handler does. This crate supplies the three
//! reference handlers and the registry table wiring them up; additional
//! handlers can be registered by callers without engine changes.

use std::sync::Arc;

use engine::ActionRegistry;

pub mod http;
pub mod transform;
pub mod xml;

pub use http::HttpGetAction;
pub use transform::JqTransformAction;
pub use xml::XmlToJsonAction;

/// Build the immutable table of built-in handlers.
///
/// Called once at process start; the result is shared read-only by every
/// concurrent run.
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.insert("http_get".to_string(), Arc::new(HttpGetAction::new()));
    registry.insert("xml_to_json".to_string(), Arc::new(XmlToJsonAction));
    registry.insert("jq_transform".to_string(), Arc::new(JqTransformAction));
    registry
}
