//! Module lifecycle orchestration.
//!
//! The manager drives modules between the `uninstalled` and `installed`
//! states. Each transition runs the module's hook (if it declares one), flips
//! the flag and saves the manifest. Transitions are not guarded: installing an
//! installed module runs its installer again and saves again.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::module::Module;
use crate::repository::{ModuleRepository, Selection};

/// What `remove` does with a module's directory once it is uninstalled and
/// evicted from the indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Leave the module directory on disk.
    #[default]
    KeepFiles,
    /// Delete the module directory.
    DeleteDirectory,
}

pub struct ModuleManager {
    repository: ModuleRepository,
    removal: RemovalPolicy,
}

impl ModuleManager {
    pub fn new(repository: ModuleRepository) -> Self {
        Self {
            repository,
            removal: RemovalPolicy::default(),
        }
    }

    pub fn with_removal_policy(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal
    }

    pub fn repository(&self) -> &ModuleRepository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut ModuleRepository {
        &mut self.repository
    }

    // Install

    /// Install every module in the uninstalled index. Returns how many were
    /// processed; the first failure stops the batch.
    #[tracing::instrument(skip(self))]
    pub fn install_all(&mut self) -> Result<usize> {
        let names = self.repository.names(Selection::Uninstalled)?;
        for name in &names {
            self.install(name)?;
        }
        Ok(names.len())
    }

    /// Install a module by name.
    ///
    /// Returns `Ok(false)` when no such module exists, otherwise whether the
    /// manifest was saved.
    #[tracing::instrument(skip(self))]
    pub fn install(&mut self, name: &str) -> Result<bool> {
        self.repository.load_if_needed()?;
        let Some(module) = self.repository.get(name) else {
            debug!("Module {} not found", name);
            return Ok(false);
        };
        self.run_installer(module)?;

        let Some(module) = self.repository.get_mut(name) else {
            return Ok(false);
        };
        mark(module, true)
    }

    /// Install a module that is not owned by the repository.
    pub fn install_module(&self, module: &mut Module) -> Result<bool> {
        self.run_installer(module)?;
        mark(module, true)
    }

    fn run_installer(&self, module: &Module) -> Result<()> {
        let Some(hook) = module.installer() else {
            return Ok(());
        };
        let installer = module
            .context()
            .capabilities()
            .installer_for(&hook.class)
            .with_context(|| format!("Installer {} is not registered", hook.class))?;

        info!("Running installer {} for module {}", hook, module.name());
        installer.install(hook.method_or("install"), module, self)
    }

    // Uninstall

    #[tracing::instrument(skip(self))]
    pub fn uninstall_all(&mut self) -> Result<usize> {
        let names = self.repository.names(Selection::Installed)?;
        for name in &names {
            self.uninstall(name)?;
        }
        Ok(names.len())
    }

    #[tracing::instrument(skip(self))]
    pub fn uninstall(&mut self, name: &str) -> Result<bool> {
        self.repository.load_if_needed()?;
        let Some(module) = self.repository.get(name) else {
            debug!("Module {} not found", name);
            return Ok(false);
        };
        self.run_uninstaller(module)?;

        let Some(module) = self.repository.get_mut(name) else {
            return Ok(false);
        };
        mark(module, false)
    }

    pub fn uninstall_module(&self, module: &mut Module) -> Result<bool> {
        self.run_uninstaller(module)?;
        mark(module, false)
    }

    fn run_uninstaller(&self, module: &Module) -> Result<()> {
        let Some(hook) = module.uninstaller() else {
            return Ok(());
        };
        let uninstaller = module
            .context()
            .capabilities()
            .uninstaller_for(&hook.class)
            .with_context(|| format!("Uninstaller {} is not registered", hook.class))?;

        info!("Running uninstaller {} for module {}", hook, module.name());
        uninstaller.uninstall(hook.method_or("uninstall"), module, self)
    }

    // Remove

    #[tracing::instrument(skip(self))]
    pub fn remove_all(&mut self) -> Result<usize> {
        self.remove_selection(Selection::All)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_installed(&mut self) -> Result<usize> {
        self.remove_selection(Selection::Installed)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_uninstalled(&mut self) -> Result<usize> {
        self.remove_selection(Selection::Uninstalled)
    }

    fn remove_selection(&mut self, selection: Selection) -> Result<usize> {
        let names = self.repository.names(selection)?;
        for name in &names {
            self.remove(name)?;
        }
        Ok(names.len())
    }

    /// Remove a module by name: uninstall it (the uninstaller always runs),
    /// evict it from every index, then apply the removal policy.
    ///
    /// Returns `Ok(false)` when no such module exists, otherwise whether the
    /// uninstalled state was saved.
    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if !self.repository.has_module(name)? {
            debug!("Module {} not found", name);
            return Ok(false);
        }

        let saved = self.uninstall(name)?;
        if let Some(module) = self.repository.evict(name) {
            self.dispose(module.path().to_path_buf())?;
        }
        Ok(saved)
    }

    /// Remove a module that may or may not be owned by the repository. An
    /// indexed module with the same name and path is evicted.
    pub fn remove_module(&mut self, mut module: Module) -> Result<bool> {
        let saved = self.uninstall_module(&mut module)?;

        let indexed = self
            .repository
            .get(module.name())
            .is_some_and(|m| m.path() == module.path());
        if indexed {
            self.repository.evict(module.name());
        }

        self.dispose(module.path().to_path_buf())?;
        Ok(saved)
    }

    fn dispose(&self, path: PathBuf) -> Result<()> {
        match self.removal {
            RemovalPolicy::KeepFiles => {
                debug!("Keeping module files at {:?}", path);
            }
            RemovalPolicy::DeleteDirectory => {
                info!("Deleting module directory {:?}", path);
                self.repository
                    .context()
                    .runtime()
                    .remove_dir_all(&path)
                    .with_context(|| format!("Failed to delete module directory {:?}", path))?;
            }
        }
        Ok(())
    }

    // Repository delegation

    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.repository.add_dir(dir);
        self
    }

    pub fn add_dirs<I, P>(&mut self, dirs: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.repository.add_dirs(dirs);
        self
    }

    pub fn has_dir(&self, dir: &std::path::Path) -> bool {
        self.repository.has_dir(dir)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        self.repository.dirs()
    }

    pub fn modules(&mut self) -> Result<Vec<&Module>> {
        self.repository.modules()
    }

    pub fn module(&mut self, name: &str) -> Result<Option<&Module>> {
        self.repository.module(name)
    }

    pub fn installed_modules(&mut self) -> Result<Vec<&Module>> {
        self.repository.installed_modules()
    }

    pub fn uninstalled_modules(&mut self) -> Result<Vec<&Module>> {
        self.repository.uninstalled_modules()
    }

    pub fn has_module(&mut self, name: &str) -> Result<bool> {
        self.repository.has_module(name)
    }

    pub fn reload(&mut self) -> Result<()> {
        self.repository.reload()
    }
}

/// Flip the installed flag and persist it.
fn mark(module: &mut Module, installed: bool) -> Result<bool> {
    let saved = module.set_installed(installed)?.save()?;
    debug!(
        "Module {} marked {} (saved: {})",
        module.name(),
        if installed { "installed" } else { "uninstalled" },
        saved
    );
    Ok(saved)
}
