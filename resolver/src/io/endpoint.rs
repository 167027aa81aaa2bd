//! Process-wide registry endpoint property.
//!
//! Cloud and server sources point the provider at a registry endpoint by setting
//! this property before enumeration starts. The value is global to the process
//! and outlives the resolution that set it: two resolutions targeting different
//! endpoints must not run concurrently in the same process.

use std::sync::{PoisonError, RwLock};

use tracing::info;

/// Name of the property providers read the registry endpoint from.
pub const REGISTRY_SERVERS_PROPERTY: &str = "nuix.registry.servers";

static REGISTRY_SERVERS: RwLock<Option<String>> = RwLock::new(None);

/// Set the registry endpoint for the whole process.
pub fn set_registry_servers(endpoint: &str) {
    info!(property = REGISTRY_SERVERS_PROPERTY, endpoint, "setting registry endpoint");
    let mut guard = REGISTRY_SERVERS
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *guard = Some(endpoint.to_string());
}

/// Current registry endpoint, if any resolution has set one.
pub fn registry_servers() -> Option<String> {
    REGISTRY_SERVERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_is_visible_process_wide() {
        set_registry_servers("nms.internal:27443");
        let seen = std::thread::spawn(registry_servers)
            .join()
            .expect("join reader thread");
        assert!(seen.is_some());
    }
}
