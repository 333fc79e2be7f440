//! The group registry.
//!
//! A [`Registry`] is an explicit handle over the process's named groups,
//! the installed peer picker, and the server-start hook. Groups live for
//! the life of the registry; there is no teardown.

use std::collections::HashMap;
use std::sync::{Arc, Once, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::group::{Group, GroupConfig, Loader};
use crate::peers::PeerPicker;

pub(crate) struct RegistryInner {
    groups: RwLock<HashMap<String, Arc<Group>>>,
    picker: OnceLock<Arc<dyn PeerPicker>>,
    server_start: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    first_group: Once,
}

impl RegistryInner {
    pub(crate) fn picker(&self) -> Option<&Arc<dyn PeerPicker>> {
        self.picker.get()
    }
}

/// Handle over a process's named groups.
///
/// Cloning is cheap; clones share the same group table.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                groups: RwLock::new(HashMap::new()),
                picker: OnceLock::new(),
                server_start: Mutex::new(None),
                first_group: Once::new(),
            }),
        }
    }

    /// Register a hook that runs at most once, before the first group
    /// returns to its creator. The peer RPC layer uses this to register
    /// its serving endpoint.
    ///
    /// # Panics
    ///
    /// Panics if a hook is already registered.
    pub fn register_server_start(&self, hook: impl FnOnce() + Send + 'static) {
        let mut slot = self.inner.server_start.lock();
        if slot.is_some() {
            panic!("register_server_start called more than once");
        }
        *slot = Some(Box::new(hook));
    }

    /// Install the peer picker consulted by every group.
    ///
    /// # Panics
    ///
    /// Panics if a picker is already installed.
    pub fn set_peer_picker(&self, picker: Arc<dyn PeerPicker>) {
        if self.inner.picker.set(picker).is_err() {
            panic!("set_peer_picker called more than once");
        }
    }

    /// Create a coordinated group around `loader`.
    ///
    /// The group attempts (but does not guarantee) that only one load for
    /// a given key runs at a time across the entire set of peer processes.
    ///
    /// # Panics
    ///
    /// Panics if a group with the same name already exists; duplicate
    /// registration is a programming error.
    pub fn add_group(
        &self,
        name: &str,
        config: GroupConfig,
        loader: Arc<dyn Loader>,
    ) -> Arc<Group> {
        self.inner.first_group.call_once(|| {
            if let Some(hook) = self.inner.server_start.lock().take() {
                hook();
            }
        });

        let mut groups = self.inner.groups.write();
        if groups.contains_key(name) {
            panic!("duplicate registration of group {name}");
        }
        let group = Arc::new(Group::new(
            name,
            config,
            loader,
            Arc::downgrade(&self.inner),
        ));
        groups.insert(name.to_string(), group.clone());
        tracing::info!(group = name, "group registered");
        group
    }

    /// Look up a previously created group.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.inner.groups.read().get(name).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("groups", &self.inner.groups.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Sink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_util::sync::CancellationToken;

    struct NopLoader;

    #[async_trait]
    impl Loader for NopLoader {
        async fn load(
            &self,
            _ctx: &CancellationToken,
            key: &str,
            dest: &mut dyn Sink,
        ) -> Result<(), Error> {
            dest.set_string(key)
        }
    }

    #[test]
    fn test_get_group() {
        let registry = Registry::new();
        let group = registry.add_group("g", GroupConfig::new(1024), Arc::new(NopLoader));
        assert_eq!(group.name(), "g");
        assert!(registry.get_group("g").is_some());
        assert!(registry.get_group("missing").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate registration")]
    fn test_duplicate_group_panics() {
        let registry = Registry::new();
        registry.add_group("dup", GroupConfig::new(1024), Arc::new(NopLoader));
        registry.add_group("dup", GroupConfig::new(1024), Arc::new(NopLoader));
    }

    #[test]
    fn test_server_start_hook_runs_once() {
        let registry = Registry::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_hook = fired.clone();
        registry.register_server_start(move || {
            fired_hook.store(true, Ordering::SeqCst);
        });

        assert!(!fired.load(Ordering::SeqCst));
        registry.add_group("a", GroupConfig::new(1024), Arc::new(NopLoader));
        assert!(fired.load(Ordering::SeqCst));

        // A second group does not re-run the hook (it is consumed).
        registry.add_group("b", GroupConfig::new(1024), Arc::new(NopLoader));
    }

    #[test]
    #[should_panic(expected = "register_server_start")]
    fn test_double_hook_panics() {
        let registry = Registry::new();
        registry.register_server_start(|| {});
        registry.register_server_start(|| {});
    }
}
