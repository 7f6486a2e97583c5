use anyhow::Result;
use std::path::Path;

use crate::boot::{BootReport, CapabilityRegistrar, ComponentRegistrar, FileLoader, boot};
use crate::manager::ModuleManager;

/// Prints each provider before activating it.
struct PlanRegistrar {
    inner: CapabilityRegistrar,
}

impl ComponentRegistrar for PlanRegistrar {
    fn register(&mut self, component_id: &str) -> Result<()> {
        println!("register {}", component_id);
        self.inner.register(component_id)
    }
}

/// Prints each side file instead of loading it.
struct PlanLoader;

impl FileLoader for PlanLoader {
    fn load(&mut self, path: &Path) -> Result<()> {
        println!("load {}", path.display());
        Ok(())
    }
}

/// Activate installed modules and print the activation plan
#[tracing::instrument(skip(manager))]
pub fn boot_plan(manager: &mut ModuleManager) -> Result<BootReport> {
    let capabilities = manager.repository().context().shared_capabilities();
    let mut registrar = PlanRegistrar {
        inner: CapabilityRegistrar::new(capabilities),
    };
    let report = boot(manager, &mut registrar, &mut PlanLoader)?;
    println!("Booted {} module(s).", report.modules.len());
    Ok(report)
}
