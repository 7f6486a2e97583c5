use anyhow::{Result, bail};
use log::debug;

use crate::manager::ModuleManager;
use crate::module::Module;

use super::list::status;

/// Show detailed information about a module
#[tracing::instrument(skip(manager))]
pub fn show(manager: &mut ModuleManager, name: &str) -> Result<()> {
    debug!("Showing info for {}", name);
    let Some(module) = manager.module(name)? else {
        bail!("Module {} not found.", name);
    };
    print!("{}", describe(module));
    Ok(())
}

fn describe(module: &Module) -> String {
    let mut out = String::new();
    out.push_str(&format!("Module: {}\n", module.name()));
    out.push_str(&format!("Directory: {}\n", module.path().display()));
    out.push_str(&format!("Status: {}\n", status(module)));

    out.push_str(&format!(
        "Installer: {}\n",
        module
            .installer()
            .map(|h| h.to_string())
            .unwrap_or_else(|| "(none)".into())
    ));
    out.push_str(&format!(
        "Uninstaller: {}\n",
        module
            .uninstaller()
            .map(|h| h.to_string())
            .unwrap_or_else(|| "(none)".into())
    ));

    out.push_str("\nProviders:\n");
    if module.providers().is_empty() {
        out.push_str("  (none)\n");
    }
    for provider in module.providers() {
        out.push_str(&format!("  {}\n", provider));
    }

    out.push_str("\nFiles:\n");
    if module.files().is_empty() {
        out.push_str("  (none)\n");
    }
    for (entry, resolved) in module.files().iter().zip(module.resolved_files()) {
        out.push_str(&format!("  {} -> {}\n", entry, resolved.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, MockInstaller, MockServiceProvider};
    use crate::repository::ModuleRepository;
    use crate::test_utils::{ModuleFixture, context_with};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_describe() {
        let root = tempdir().unwrap();
        let mut caps = Capabilities::new();
        caps.provide("app.Blog", Arc::new(MockServiceProvider::new()))
            .installer("Setup", Arc::new(MockInstaller::new()));
        let ctx = context_with(caps);
        let blog = ModuleFixture::new(root.path(), "blog")
            .field("providers", json!(["app.Blog"]))
            .field("files", json!(["routes.rs"]))
            .field("installer", json!("Setup::migrate"))
            .file("routes.rs")
            .write();

        let text = describe(&blog.load(&ctx));

        assert!(text.starts_with("Module: blog\n"));
        assert!(text.contains("Status: uninstalled\n"));
        assert!(text.contains("Installer: Setup::migrate\n"));
        assert!(text.contains("Uninstaller: (none)\n"));
        assert!(text.contains("\nProviders:\n  app.Blog\n"));
        assert!(text.contains(&format!(
            "  routes.rs -> {}\n",
            blog.dir().join("routes.rs").display()
        )));
    }

    #[test]
    fn test_show_unknown_module() {
        let root = tempdir().unwrap();
        let mut repo = ModuleRepository::new(context_with(Capabilities::new()));
        repo.add_dir(root.path());
        let mut manager = ModuleManager::new(repo);

        let err = show(&mut manager, "nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "Module nonexistent not found.");
    }
}
