//! Startup activation of installed modules.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexSet;
use log::{debug, info};

use crate::capability::Capabilities;
use crate::manager::ModuleManager;

/// Receives the service providers declared by installed modules.
#[cfg_attr(test, mockall::automock)]
pub trait ComponentRegistrar {
    fn register(&mut self, component_id: &str) -> Result<()>;
}

/// Loads the side files declared by installed modules.
#[cfg_attr(test, mockall::automock)]
pub trait FileLoader {
    fn load(&mut self, path: &std::path::Path) -> Result<()>;
}

/// What a boot pass activated, in activation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub modules: Vec<String>,
    pub providers: Vec<String>,
    pub files: Vec<PathBuf>,
}

/// Activate every installed module: register its providers in manifest order,
/// then load its files in manifest order. A file shared by several modules is
/// loaded once, however its entries spell the path.
#[tracing::instrument(skip_all)]
pub fn boot(
    manager: &mut ModuleManager,
    registrar: &mut dyn ComponentRegistrar,
    loader: &mut dyn FileLoader,
) -> Result<BootReport> {
    let mut report = BootReport::default();
    let mut loaded = HashSet::new();
    let ctx = manager.repository().context().clone();

    for module in manager.installed_modules()? {
        debug!("Booting module {}", module.name());

        for provider in module.providers() {
            registrar
                .register(provider)
                .with_context(|| format!("Failed to register {} for {}", provider, module.name()))?;
            report.providers.push(provider.clone());
        }

        for file in module.resolved_files() {
            let key = ctx
                .runtime()
                .canonicalize(&file)
                .unwrap_or_else(|_| file.clone());
            if !loaded.insert(key) {
                debug!("Skipping already loaded {:?}", file);
                continue;
            }
            loader
                .load(&file)
                .with_context(|| format!("Failed to load {:?} for {}", file, module.name()))?;
            report.files.push(file);
        }

        report.modules.push(module.name().to_string());
    }

    info!(
        "Booted {} module(s): {} provider(s), {} file(s)",
        report.modules.len(),
        report.providers.len(),
        report.files.len()
    );
    Ok(report)
}

/// Registrar that activates providers from a capability registry.
///
/// Each provider is activated at most once, however many modules declare it.
pub struct CapabilityRegistrar {
    capabilities: Arc<Capabilities>,
    registered: IndexSet<String>,
}

impl CapabilityRegistrar {
    pub fn new(capabilities: Arc<Capabilities>) -> Self {
        Self {
            capabilities,
            registered: IndexSet::new(),
        }
    }

    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.registered.iter().map(String::as_str)
    }
}

impl ComponentRegistrar for CapabilityRegistrar {
    fn register(&mut self, component_id: &str) -> Result<()> {
        if self.registered.contains(component_id) {
            debug!("Provider {} already registered", component_id);
            return Ok(());
        }
        let provider = self
            .capabilities
            .provider_for(component_id)
            .with_context(|| format!("Service provider {} is not registered", component_id))?;
        provider.register()?;
        self.registered.insert(component_id.to_string());
        Ok(())
    }
}
