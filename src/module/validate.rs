//! Manifest validation rules.
//!
//! Every rule is fail-fast: the first violation is returned as a
//! [`ManifestError`] naming the field, class or file and the module path.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::capability::{Capability, HookRef};
use crate::context::HostContext;

use super::{MANIFEST_FILE, ManifestError};

type Result<T> = std::result::Result<T, ManifestError>;

pub(crate) struct Validator<'a> {
    ctx: &'a HostContext,
    path: &'a Path,
}

impl<'a> Validator<'a> {
    pub(crate) fn new(ctx: &'a HostContext, path: &'a Path) -> Self {
        Self { ctx, path }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(ManifestError::invalid(message, self.path))
    }

    // Checks on typed values

    pub(crate) fn path(&self) -> Result<()> {
        let runtime = self.ctx.runtime();
        if !runtime.is_dir(self.path) {
            return self.error("Module path is not a directory.");
        }
        if !runtime.is_writable(&self.path.join(MANIFEST_FILE)) {
            return self.error(format!("File [{}] is not writable.", MANIFEST_FILE));
        }
        Ok(())
    }

    pub(crate) fn name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return self.error("Property [name] should not be empty.");
        }
        Ok(())
    }

    pub(crate) fn providers(&self, providers: &[String]) -> Result<()> {
        for provider in providers {
            self.class_exists(provider)?;
        }
        for provider in providers {
            self.class_implements(provider, Capability::ServiceProvider)?;
        }
        Ok(())
    }

    pub(crate) fn files(&self, files: &[String]) -> Result<()> {
        let runtime = self.ctx.runtime();
        for file in files {
            if !runtime.is_file(&resolve_file(self.path, file)) {
                return self.error(format!("File [{}] does not exist.", file));
            }
        }
        Ok(())
    }

    pub(crate) fn hook(&self, hook: Option<&HookRef>, capability: Capability) -> Result<()> {
        if let Some(hook) = hook {
            self.class_exists(&hook.class)?;
            self.class_implements(&hook.class, capability)?;
        }
        Ok(())
    }

    fn class_exists(&self, class: &str) -> Result<()> {
        if !self.ctx.capabilities().exists(class) {
            return self.error(format!("Class [{}] does not exist.", class));
        }
        Ok(())
    }

    fn class_implements(&self, class: &str, capability: Capability) -> Result<()> {
        if !self.ctx.capabilities().implements(class, capability) {
            return self.error(format!(
                "Class [{}] must implement [{}] interface.",
                class, capability
            ));
        }
        Ok(())
    }

    // Extraction from the raw manifest

    pub(crate) fn object(&self, manifest: Value) -> Result<Map<String, Value>> {
        match manifest {
            Value::Object(map) => Ok(map),
            _ => self.error("Manifest should be a JSON object."),
        }
    }

    pub(crate) fn read_name(&self, manifest: &Map<String, Value>) -> Result<String> {
        match manifest.get("name") {
            Some(Value::String(name)) => {
                self.name(name)?;
                Ok(name.clone())
            }
            _ => self.error("Property [name] should be a string."),
        }
    }

    pub(crate) fn read_installed(&self, manifest: &Map<String, Value>) -> Result<bool> {
        match manifest.get("installed") {
            Some(Value::Bool(installed)) => Ok(*installed),
            _ => self.error("Property [installed] should be a boolean."),
        }
    }

    /// Read an optional array of strings. Missing and `null` read as empty.
    pub(crate) fn read_strings(
        &self,
        manifest: &Map<String, Value>,
        field: &str,
    ) -> Result<Vec<String>> {
        match manifest.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => self.error(format!("Property [{}] should only contain strings.", field)),
                })
                .collect(),
            Some(_) => self.error(format!("Property [{}] should be an array.", field)),
        }
    }

    /// Read an optional hook reference. Missing, `null` and `""` read as none.
    pub(crate) fn read_hook(
        &self,
        manifest: &Map<String, Value>,
        field: &str,
    ) -> Result<Option<HookRef>> {
        match manifest.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => match s.parse::<HookRef>() {
                Ok(hook) => Ok(Some(hook)),
                Err(e) => self.error(format!("Property [{}] is invalid: {}.", field, e)),
            },
            Some(_) => self.error(format!("Property [{}] should be a string.", field)),
        }
    }
}

/// Resolve a manifest file entry; relative entries are taken relative to the
/// module directory.
pub(crate) fn resolve_file(module_path: &Path, file: &str) -> PathBuf {
    let file = Path::new(file);
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        module_path.join(file)
    }
}
