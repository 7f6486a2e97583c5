use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    capability::{Capabilities, CommandHook, LoggingProvider},
    context::HostContext,
    manager::{ModuleManager, RemovalPolicy},
    repository::{DiscoveryPolicy, ModuleRepository},
    runtime::Runtime,
};

use super::hook_spec::HookSpec;

/// Environment variable listing module directories (platform path-list
/// separated) when no `--dir` is given.
pub const DIRS_ENV: &str = "MODHOST_DIRS";

pub struct Config {
    pub dirs: Vec<PathBuf>,
    pub discovery: DiscoveryPolicy,
    pub removal: RemovalPolicy,
    pub hooks: Vec<HookSpec>,
    pub providers: Vec<String>,
}

impl Config {
    /// Resolve the module directories: explicit `dirs`, then `MODHOST_DIRS`,
    /// then `<data_dir>/modhost/modules`. Relative entries are taken relative
    /// to the current directory.
    pub fn new(runtime: &dyn Runtime, dirs: Vec<PathBuf>, strict: bool) -> Result<Self> {
        let dirs = if !dirs.is_empty() {
            dirs
        } else if let Ok(value) = runtime.env_var(DIRS_ENV) {
            debug!("Using {}={}", DIRS_ENV, value);
            std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        } else {
            vec![default_modules_dir(runtime)?]
        };

        let cwd = runtime.current_dir()?;
        let dirs = dirs
            .into_iter()
            .map(|dir| if dir.is_absolute() { dir } else { cwd.join(dir) })
            .collect();

        Ok(Self {
            dirs,
            discovery: if strict {
                DiscoveryPolicy::Abort
            } else {
                DiscoveryPolicy::Collect
            },
            removal: RemovalPolicy::KeepFiles,
            hooks: Vec::new(),
            providers: Vec::new(),
        })
    }

    pub fn with_removal(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    pub fn with_components(mut self, hooks: Vec<HookSpec>, providers: Vec<String>) -> Self {
        self.hooks = hooks;
        self.providers = providers;
        self
    }

    /// Register every `--hook` as both installer and uninstaller, and every
    /// `--provider` as a logging service provider.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        for spec in &self.hooks {
            let hook = Arc::new(CommandHook::new(&spec.program));
            caps.installer(spec.id.as_str(), hook.clone())
                .uninstaller(spec.id.as_str(), hook);
        }
        for id in &self.providers {
            caps.provide(id.as_str(), Arc::new(LoggingProvider::new(id.as_str())));
        }
        caps
    }

    pub fn manager(&self, runtime: Arc<dyn Runtime>) -> ModuleManager {
        let ctx = HostContext::new(runtime, Arc::new(self.capabilities()));
        let mut repository = ModuleRepository::new(ctx).with_policy(self.discovery);
        repository.add_dirs(self.dirs.iter().cloned());
        ModuleManager::new(repository).with_removal_policy(self.removal)
    }
}

/// Get the default module directory
#[tracing::instrument(skip(runtime))]
pub fn default_modules_dir(runtime: &dyn Runtime) -> Result<PathBuf> {
    let data_dir = runtime
        .data_dir()
        .context("Could not find data directory")?;
    Ok(data_dir.join("modhost").join("modules"))
}
