use anyhow::{Result, bail};
use log::debug;

use crate::manager::ModuleManager;

/// Install one module by name, or every uninstalled module when `name` is
/// `None`.
#[tracing::instrument(skip(manager))]
pub fn install(manager: &mut ModuleManager, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            ensure_known(manager, name)?;
            let saved = manager.install(name)?;
            report_unsaved(name, saved);
            println!("Installed {}", name);
        }
        None => {
            let count = manager.install_all()?;
            println!("Installed {} module(s).", count);
        }
    }
    Ok(())
}

/// Uninstall one module by name, or every installed module when `name` is
/// `None`.
#[tracing::instrument(skip(manager))]
pub fn uninstall(manager: &mut ModuleManager, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            ensure_known(manager, name)?;
            let saved = manager.uninstall(name)?;
            report_unsaved(name, saved);
            println!("Uninstalled {}", name);
        }
        None => {
            let count = manager.uninstall_all()?;
            println!("Uninstalled {} module(s).", count);
        }
    }
    Ok(())
}

pub(crate) fn ensure_known(manager: &mut ModuleManager, name: &str) -> Result<()> {
    if !manager.has_module(name)? {
        bail!("Module {} not found.", name);
    }
    Ok(())
}

pub(crate) fn report_unsaved(name: &str, saved: bool) {
    if !saved {
        debug!("Manifest of {} was not saved", name);
        eprintln!("warning: could not save the manifest of {}", name);
    }
}
