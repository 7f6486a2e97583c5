//! Capabilities backed by the host process: external hook programs and
//! providers whose activation is only logged.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::manager::ModuleManager;
use crate::module::Module;

use super::{Installer, ServiceProvider, Uninstaller};

/// Runs an external program as an installer/uninstaller hook.
///
/// Invoked as `<program> <method> <module-name> <module-path>` with the
/// module directory as working directory. A non-zero exit status fails the
/// hook.
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: PathBuf,
}

impl CommandHook {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    #[tracing::instrument(skip(self, module))]
    fn run(&self, method: &str, module: &Module) -> Result<()> {
        debug!(
            "Running hook {:?} {} for module {}",
            self.program,
            method,
            module.name()
        );
        let status = Command::new(&self.program)
            .arg(method)
            .arg(module.name())
            .arg(module.path())
            .current_dir(module.path())
            .status()
            .with_context(|| format!("Failed to run hook program {:?}", self.program))?;

        if !status.success() {
            bail!(
                "Hook {:?} {} failed for module {} ({})",
                self.program,
                method,
                module.name(),
                status
            );
        }
        Ok(())
    }
}

impl Installer for CommandHook {
    fn install(&self, method: &str, module: &Module, _manager: &ModuleManager) -> Result<()> {
        self.run(method, module)
    }
}

impl Uninstaller for CommandHook {
    fn uninstall(&self, method: &str, module: &Module, _manager: &ModuleManager) -> Result<()> {
        self.run(method, module)
    }
}

/// A service provider whose activation is a log line.
#[derive(Debug, Clone)]
pub struct LoggingProvider {
    id: String,
}

impl LoggingProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl ServiceProvider for LoggingProvider {
    fn register(&self) -> Result<()> {
        info!("Activated provider {}", self.id);
        Ok(())
    }
}
