//! Process-wide named logger registry
//!
//! Optional convenience for applications that want to reach a shared
//! logger by name instead of threading handles through every call site.
//! The registry holds `Arc<Logger>`; a logger shuts down when its last
//! handle drops, so `unregister` releases it for callers that kept none.

use crate::core::logger::Logger;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Logger>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, Arc<Logger>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a logger under its own name, replacing any previous entry.
/// Returns the replaced logger when there was one.
pub fn register(logger: Arc<Logger>) -> Option<Arc<Logger>> {
    registry()
        .write()
        .insert(logger.name().to_string(), logger)
}

/// Fetch a registered logger by name.
pub fn get(name: &str) -> Option<Arc<Logger>> {
    registry().read().get(name).cloned()
}

/// Remove a logger from the registry, returning it.
pub fn unregister(name: &str) -> Option<Arc<Logger>> {
    registry().write().remove(name)
}

/// Names of all registered loggers, unordered.
pub fn names() -> Vec<String> {
    registry().read().keys().cloned().collect()
}

/// Drop every registry entry. Loggers still held elsewhere stay alive.
pub fn clear() {
    registry().write().clear();
}
