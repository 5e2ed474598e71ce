//! Registration callback trait.

use std::sync::Arc;

use super::Component;

/// Trait for registering components without depending on the registry crate.
///
/// The plugin host receives an implementation of this trait and calls it after
/// every successful plugin load.
pub trait ComponentRegistryAccess: Send + Sync {
    /// Register a component, returning the entry it replaced, if any.
    fn register_component(&self, component: Component) -> Option<Arc<Component>>;

    /// Put back an entry returned by an earlier call, keeping its state.
    fn restore_component(&self, component: Arc<Component>) -> Option<Arc<Component>>;

    /// Remove a component by name, returning it.
    fn unregister_component(&self, name: &str) -> Option<Arc<Component>>;
}
