use anyhow::Result;
use log::debug;

use crate::manager::ModuleManager;
use crate::module::Module;
use crate::repository::Selection;

/// List discovered modules
#[tracing::instrument(skip(manager))]
pub fn list(manager: &mut ModuleManager, selection: Selection) -> Result<()> {
    debug!("Listing modules from {:?}", manager.dirs());

    let modules = manager.repository_mut().select(selection)?;
    if modules.is_empty() {
        println!("No modules found.");
    }
    for module in &modules {
        println!("{}", format_line(module));
    }

    let skipped = manager.repository().failures().len();
    if skipped > 0 {
        debug!("{} manifest(s) skipped", skipped);
    }
    Ok(())
}

pub(crate) fn status(module: &Module) -> &'static str {
    if module.is_installed() {
        "installed"
    } else {
        "uninstalled"
    }
}

fn format_line(module: &Module) -> String {
    format!(
        "{}  {}  {}",
        module.name(),
        status(module),
        module.path().display()
    )
}
