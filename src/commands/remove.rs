use anyhow::Result;
use log::debug;

use crate::manager::ModuleManager;
use crate::repository::Selection;

use super::install::{ensure_known, report_unsaved};

/// What `remove` applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    Name(String),
    Each(Selection),
}

/// Remove modules: uninstall them and drop them from the registry. The
/// manager's removal policy decides whether their directories are deleted.
#[tracing::instrument(skip(manager))]
pub fn remove(manager: &mut ModuleManager, target: RemoveTarget) -> Result<()> {
    debug!("Removing {:?} ({:?})", target, manager.removal_policy());
    match target {
        RemoveTarget::Name(name) => {
            ensure_known(manager, &name)?;
            let saved = manager.remove(&name)?;
            report_unsaved(&name, saved);
            println!("Removed {}", name);
        }
        RemoveTarget::Each(selection) => {
            let count = match selection {
                Selection::All => manager.remove_all()?,
                Selection::Installed => manager.remove_installed()?,
                Selection::Uninstalled => manager.remove_uninstalled()?,
            };
            println!("Removed {} module(s).", count);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::manager::RemovalPolicy;
    use crate::repository::ModuleRepository;
    use crate::test_utils::{ModuleFixture, context_with};
    use tempfile::tempdir;

    fn manager_for(fixtures: &[&ModuleFixture], removal: RemovalPolicy) -> ModuleManager {
        let mut repo = ModuleRepository::new(context_with(Capabilities::new()));
        repo.add_dirs(fixtures.iter().map(|f| f.dir().to_path_buf()));
        ModuleManager::new(repo).with_removal_policy(removal)
    }

    #[test]
    fn test_remove_by_name_keeps_files() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").installed(true).write();
        let mut manager = manager_for(&[&blog], RemovalPolicy::KeepFiles);

        remove(&mut manager, RemoveTarget::Name("blog".into())).unwrap();

        assert!(blog.manifest_path().exists());
        assert!(!manager.has_module("blog").unwrap());
    }

    #[test]
    fn test_remove_by_name_purges() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").write();
        let mut manager = manager_for(&[&blog], RemovalPolicy::DeleteDirectory);

        remove(&mut manager, RemoveTarget::Name("blog".into())).unwrap();

        assert!(!blog.dir().exists());
    }

    #[test]
    fn test_remove_selection() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").installed(true).write();
        let shop = ModuleFixture::new(root.path(), "shop").write();
        let mut manager = manager_for(&[&blog, &shop], RemovalPolicy::KeepFiles);

        remove(&mut manager, RemoveTarget::Each(Selection::Uninstalled)).unwrap();

        assert!(manager.has_module("blog").unwrap());
        assert!(!manager.has_module("shop").unwrap());
    }

    #[test]
    fn test_remove_unknown_name() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").write();
        let mut manager = manager_for(&[&blog], RemovalPolicy::DeleteDirectory);

        let err = remove(&mut manager, RemoveTarget::Name("shop".into())).unwrap_err();
        assert_eq!(err.to_string(), "Module shop not found.");
        assert!(blog.dir().exists());
    }
}
