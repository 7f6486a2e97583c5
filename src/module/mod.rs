//! Manifest-backed module entity.
//!
//! A module is a directory holding a `module.json` manifest. The manifest
//! file is the source of truth; a [`Module`] is an in-memory copy of it that
//! validates every change and writes itself back on [`Module::save`].

mod error;
mod validate;

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::capability::{Capability, HookRef};
use crate::context::HostContext;

pub use error::ManifestError;
use validate::{Validator, resolve_file};

/// File name of a module manifest.
pub const MANIFEST_FILE: &str = "module.json";

type Result<T> = std::result::Result<T, ManifestError>;

/// One discovered module.
///
/// Typed fields mirror the manifest; `manifest` keeps the whole parsed
/// object (unknown fields included, in their original order) so that a save
/// round-trips everything it did not touch.
#[derive(Debug, Clone)]
pub struct Module {
    path: PathBuf,
    name: String,
    installed: bool,
    providers: Vec<String>,
    files: Vec<String>,
    installer: Option<HookRef>,
    uninstaller: Option<HookRef>,
    manifest: Map<String, Value>,
    ctx: HostContext,
}

impl Module {
    /// Construct a module from its directory and parsed manifest.
    ///
    /// Fields are validated in manifest order (path, name, installed,
    /// providers, files, installer, uninstaller) and the first violation is
    /// returned.
    pub fn new(path: impl Into<PathBuf>, manifest: Value, ctx: HostContext) -> Result<Self> {
        let path = path.into();
        let validator = Validator::new(&ctx, &path);

        let manifest = validator.object(manifest)?;
        validator.path()?;

        let name = validator.read_name(&manifest)?;
        let installed = validator.read_installed(&manifest)?;

        let providers = validator.read_strings(&manifest, "providers")?;
        validator.providers(&providers)?;

        let files = validator.read_strings(&manifest, "files")?;
        validator.files(&files)?;

        let installer = validator.read_hook(&manifest, "installer")?;
        validator.hook(installer.as_ref(), Capability::Installer)?;

        let uninstaller = validator.read_hook(&manifest, "uninstaller")?;
        validator.hook(uninstaller.as_ref(), Capability::Uninstaller)?;

        Ok(Self {
            path,
            name,
            installed,
            providers,
            files,
            installer,
            uninstaller,
            manifest,
            ctx,
        })
    }

    /// Read and parse a manifest file, then construct the module it describes.
    /// The module directory is the manifest's parent directory.
    #[tracing::instrument(skip(ctx))]
    pub fn load(manifest_path: &Path, ctx: &HostContext) -> Result<Self> {
        let manifest = read_manifest(ctx, manifest_path)?;
        Module::new(module_dir(manifest_path), manifest, ctx.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// File entries as declared in the manifest.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// File entries resolved against the module directory.
    pub fn resolved_files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|f| resolve_file(&self.path, f))
            .collect()
    }

    pub fn installer(&self) -> Option<&HookRef> {
        self.installer.as_ref()
    }

    pub fn uninstaller(&self) -> Option<&HookRef> {
        self.uninstaller.as_ref()
    }

    /// The full manifest as it will be written by [`Module::save`].
    pub fn manifest(&self) -> &Map<String, Value> {
        &self.manifest
    }

    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(&self.ctx, &self.path)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        let name = name.into();
        self.validator().name(&name)?;
        self.manifest
            .insert("name".into(), Value::String(name.clone()));
        self.name = name;
        Ok(self)
    }

    pub fn set_installed(&mut self, installed: bool) -> Result<&mut Self> {
        self.manifest
            .insert("installed".into(), Value::Bool(installed));
        self.installed = installed;
        Ok(self)
    }

    pub fn set_providers(&mut self, providers: Vec<String>) -> Result<&mut Self> {
        self.validator().providers(&providers)?;
        self.manifest
            .insert("providers".into(), strings_to_value(&providers));
        self.providers = providers;
        Ok(self)
    }

    pub fn set_files(&mut self, files: Vec<String>) -> Result<&mut Self> {
        self.validator().files(&files)?;
        self.manifest
            .insert("files".into(), strings_to_value(&files));
        self.files = files;
        Ok(self)
    }

    pub fn set_installer(&mut self, installer: Option<HookRef>) -> Result<&mut Self> {
        self.validator()
            .hook(installer.as_ref(), Capability::Installer)?;
        self.manifest
            .insert("installer".into(), hook_to_value(installer.as_ref()));
        self.installer = installer;
        Ok(self)
    }

    pub fn set_uninstaller(&mut self, uninstaller: Option<HookRef>) -> Result<&mut Self> {
        self.validator()
            .hook(uninstaller.as_ref(), Capability::Uninstaller)?;
        self.manifest
            .insert("uninstaller".into(), hook_to_value(uninstaller.as_ref()));
        self.uninstaller = uninstaller;
        Ok(self)
    }

    /// Re-validate every field against the current file system and registry.
    pub fn validate(&self) -> Result<()> {
        let validator = self.validator();
        validator.path()?;
        validator.name(&self.name)?;
        validator.providers(&self.providers)?;
        validator.files(&self.files)?;
        validator.hook(self.installer.as_ref(), Capability::Installer)?;
        validator.hook(self.uninstaller.as_ref(), Capability::Uninstaller)?;
        Ok(())
    }

    /// Validate all fields and write the manifest back, pretty-printed.
    ///
    /// Returns `Ok(false)` when the file could not be written; validation
    /// failures are errors.
    #[tracing::instrument(skip(self), fields(module = %self.name))]
    pub fn save(&self) -> Result<bool> {
        self.validate()?;

        let mut content = match serde_json::to_string_pretty(&self.manifest) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize manifest of {}: {}", self.name, e);
                return Ok(false);
            }
        };
        content.push('\n');

        let manifest_path = self.manifest_path();
        match self.ctx.runtime().write(&manifest_path, content.as_bytes()) {
            Ok(()) => {
                debug!("Saved {:?}", manifest_path);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to save {:?}: {:#}", manifest_path, e);
                Ok(false)
            }
        }
    }
}

/// Read and decode a manifest file without validating it.
pub(crate) fn read_manifest(ctx: &HostContext, manifest_path: &Path) -> Result<Value> {
    let content = ctx
        .runtime()
        .read_to_string(manifest_path)
        .map_err(|e| ManifestError::Unreadable {
            path: manifest_path.to_path_buf(),
            source: e.into(),
        })?;

    serde_json::from_str(&content).map_err(|e| ManifestError::Malformed {
        path: manifest_path.to_path_buf(),
        source: e,
    })
}

/// The module directory a manifest file belongs to.
pub(crate) fn module_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn strings_to_value(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn hook_to_value(hook: Option<&HookRef>) -> Value {
    hook.map_or(Value::Null, |h| Value::String(h.to_string()))
}
