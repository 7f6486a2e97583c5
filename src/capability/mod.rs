//! Capability registry for module components.
//!
//! Modules refer to host components by string identifier (service providers,
//! installer and uninstaller hooks). The host registers the objects behind
//! those identifiers here, and manifests are validated against the registry
//! instead of against whatever happens to be loadable at runtime.

mod command;
mod hook;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexSet;

use crate::manager::ModuleManager;
use crate::module::Module;

pub use command::{CommandHook, LoggingProvider};
pub use hook::{HookRef, HookRefError};

/// A component that can be activated in the host process.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceProvider: Send + Sync {
    fn register(&self) -> Result<()>;
}

/// Hook run before a module is flagged as installed.
///
/// `method` is the method named in the manifest (`Class::method`), or
/// `"install"` when the manifest names only the class.
#[cfg_attr(test, mockall::automock)]
pub trait Installer: Send + Sync {
    fn install(&self, method: &str, module: &Module, manager: &ModuleManager) -> Result<()>;
}

/// Hook run before a module is flagged as uninstalled.
#[cfg_attr(test, mockall::automock)]
pub trait Uninstaller: Send + Sync {
    fn uninstall(&self, method: &str, module: &Module, manager: &ModuleManager) -> Result<()>;
}

/// The capabilities a component can satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ServiceProvider,
    Installer,
    Uninstaller,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ServiceProvider => write!(f, "ServiceProvider"),
            Capability::Installer => write!(f, "Installer"),
            Capability::Uninstaller => write!(f, "Uninstaller"),
        }
    }
}

/// Registry mapping component identifiers to capability-implementing objects.
///
/// Every identifier registered under a capability is also a known component.
/// Registering the same identifier twice under one capability replaces the
/// earlier object.
#[derive(Default, Clone)]
pub struct Capabilities {
    components: IndexSet<String>,
    providers: HashMap<String, Arc<dyn ServiceProvider>>,
    installers: HashMap<String, Arc<dyn Installer>>,
    uninstallers: HashMap<String, Arc<dyn Uninstaller>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a component that implements no capability.
    pub fn declare(&mut self, id: impl Into<String>) -> &mut Self {
        self.components.insert(id.into());
        self
    }

    pub fn provide(&mut self, id: impl Into<String>, provider: Arc<dyn ServiceProvider>) -> &mut Self {
        let id = id.into();
        self.components.insert(id.clone());
        self.providers.insert(id, provider);
        self
    }

    pub fn installer(&mut self, id: impl Into<String>, installer: Arc<dyn Installer>) -> &mut Self {
        let id = id.into();
        self.components.insert(id.clone());
        self.installers.insert(id, installer);
        self
    }

    pub fn uninstaller(
        &mut self,
        id: impl Into<String>,
        uninstaller: Arc<dyn Uninstaller>,
    ) -> &mut Self {
        let id = id.into();
        self.components.insert(id.clone());
        self.uninstallers.insert(id, uninstaller);
        self
    }

    /// Check whether a component with this identifier is known.
    pub fn exists(&self, id: &str) -> bool {
        self.components.contains(id)
    }

    /// Check whether a known component satisfies a capability.
    pub fn implements(&self, id: &str, capability: Capability) -> bool {
        match capability {
            Capability::ServiceProvider => self.providers.contains_key(id),
            Capability::Installer => self.installers.contains_key(id),
            Capability::Uninstaller => self.uninstallers.contains_key(id),
        }
    }

    pub fn provider_for(&self, id: &str) -> Option<&Arc<dyn ServiceProvider>> {
        self.providers.get(id)
    }

    pub fn installer_for(&self, id: &str) -> Option<&Arc<dyn Installer>> {
        self.installers.get(id)
    }

    pub fn uninstaller_for(&self, id: &str) -> Option<&Arc<dyn Uninstaller>> {
        self.uninstallers.get(id)
    }

    /// Known component identifiers, in registration order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_is_known_without_capability() {
        let mut caps = Capabilities::new();
        caps.declare("app.Plain");

        assert!(caps.exists("app.Plain"));
        assert!(!caps.implements("app.Plain", Capability::ServiceProvider));
        assert!(!caps.implements("app.Plain", Capability::Installer));
        assert!(!caps.implements("app.Plain", Capability::Uninstaller));
    }

    #[test]
    fn test_capability_registration_declares_component() {
        let mut caps = Capabilities::new();
        caps.provide("app.Provider", Arc::new(MockServiceProvider::new()))
            .installer("app.Setup", Arc::new(MockInstaller::new()))
            .uninstaller("app.Setup", Arc::new(MockUninstaller::new()));

        assert_eq!(caps.len(), 2);
        assert!(caps.implements("app.Provider", Capability::ServiceProvider));
        assert!(caps.implements("app.Setup", Capability::Installer));
        assert!(caps.implements("app.Setup", Capability::Uninstaller));
        assert!(!caps.implements("app.Setup", Capability::ServiceProvider));
        assert!(caps.installer_for("app.Setup").is_some());
        assert!(caps.uninstaller_for("app.Provider").is_none());
    }

    #[test]
    fn test_unknown_component() {
        let caps = Capabilities::new();

        assert!(caps.is_empty());
        assert!(!caps.exists("app.Missing"));
        assert!(caps.provider_for("app.Missing").is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut first = MockServiceProvider::new();
        first.expect_register().never();
        let mut second = MockServiceProvider::new();
        second.expect_register().times(1).returning(|| Ok(()));

        let mut caps = Capabilities::new();
        caps.provide("app.Provider", Arc::new(first));
        caps.provide("app.Provider", Arc::new(second));

        assert_eq!(caps.len(), 1);
        caps.provider_for("app.Provider").unwrap().register().unwrap();
    }

    #[test]
    fn test_components_in_registration_order() {
        let mut caps = Capabilities::new();
        caps.declare("b").declare("a").declare("b");

        let ids: Vec<&str> = caps.components().collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::ServiceProvider.to_string(), "ServiceProvider");
        assert_eq!(Capability::Installer.to_string(), "Installer");
        assert_eq!(Capability::Uninstaller.to_string(), "Uninstaller");
    }
}
