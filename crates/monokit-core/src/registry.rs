//! Component registry.
//!
//! Unifies builtin and plugin-provided components into one catalog keyed by
//! name. Iteration follows registration order so batches run
//! deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use monokit_protocols::{Component, ComponentInfo, ComponentRegistryAccess};

use crate::error::RegistryError;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    components: HashMap<String, Arc<Component>>,
}

/// Registry for managing components.
pub struct ComponentRegistry {
    inner: RwLock<Inner>,
}

impl ComponentRegistry {
    /// Create a new component registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a component.
    ///
    /// A component with the same name is replaced in place and returned.
    pub fn register(&self, component: Component) -> Option<Arc<Component>> {
        self.register_shared(Arc::new(component))
    }

    /// Register an already shared component, keeping its enabled state.
    pub fn register_shared(&self, component: Arc<Component>) -> Option<Arc<Component>> {
        let name = component.name().to_string();
        let mut inner = self.inner.write();

        let replaced = inner.components.insert(name.clone(), component.clone());
        match &replaced {
            Some(old) => warn!(
                "Component '{}' ({}) replaced by {} registration",
                name,
                old.source(),
                component.source()
            ),
            None => {
                debug!("Registered {} component '{}'", component.source(), name);
                inner.order.push(name);
            }
        }
        replaced
    }

    /// Unregister a component. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.remove(name).is_some()
    }

    /// Unregister a component and return it.
    pub fn remove(&self, name: &str) -> Option<Arc<Component>> {
        let mut inner = self.inner.write();
        let removed = inner.components.remove(name)?;
        inner.order.retain(|n| n != name);
        debug!("Unregistered component '{}'", name);
        Some(removed)
    }

    /// Get a component by name.
    pub fn get(&self, name: &str) -> Option<Arc<Component>> {
        self.inner.read().components.get(name).cloned()
    }

    /// Check if a component with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().components.contains_key(name)
    }

    /// All components in registration order.
    pub fn list(&self) -> Vec<Arc<Component>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| inner.components.get(name).cloned())
            .collect()
    }

    /// All component names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// Descriptors for every component, in registration order.
    pub fn infos(&self) -> Vec<ComponentInfo> {
        self.list().iter().map(|c| c.info()).collect()
    }

    /// Get the number of registered components.
    pub fn len(&self) -> usize {
        self.inner.read().components.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().components.is_empty()
    }

    /// Enable or disable a component by name.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let component = self
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        component.set_enabled(enabled);
        Ok(())
    }

    /// Components that should run on this host right now.
    ///
    /// Auto-detect predicates are evaluated outside the registry lock.
    pub fn eligible(&self) -> Vec<Arc<Component>> {
        self.list().into_iter().filter(|c| c.is_eligible()).collect()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistryAccess for ComponentRegistry {
    fn register_component(&self, component: Component) -> Option<Arc<Component>> {
        self.register(component)
    }

    fn restore_component(&self, component: Arc<Component>) -> Option<Arc<Component>> {
        self.register_shared(component)
    }

    fn unregister_component(&self, name: &str) -> Option<Arc<Component>> {
        self.remove(name)
    }
}
