//! Module repository: discovery and cached indices.
//!
//! The repository scans its configured directories for `module.json`
//! manifests, owns the [`Module`]s it builds from them, and keeps three
//! name-keyed indices (all, installed, uninstalled). The indices are a
//! snapshot of the last [`ModuleRepository::reload`]; changing a module's
//! installed flag does not move it between indices until the next reload.

use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use serde_json::Value;

use crate::context::HostContext;
use crate::module::{MANIFEST_FILE, ManifestError, Module, module_dir, read_manifest};

/// Builds a module from its directory and decoded manifest.
pub type ModuleFactory =
    Box<dyn Fn(&Path, Value, &HostContext) -> Result<Module, ManifestError> + Send + Sync>;

/// What `reload` does with a manifest that cannot be turned into a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryPolicy {
    /// Skip the manifest (or the directory that cannot be scanned), log it,
    /// and keep it in [`ModuleRepository::failures`].
    #[default]
    Collect,
    /// Fail the whole reload with the first error.
    Abort,
}

/// Which index to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Installed,
    Uninstalled,
}

#[derive(Default)]
struct Index {
    all: IndexMap<String, Module>,
    installed: IndexSet<String>,
    uninstalled: IndexSet<String>,
}

impl Index {
    /// Last writer wins; a replaced name keeps its position in `all`.
    /// Call [`Index::partition`] once every module is in.
    fn insert(&mut self, module: Module) {
        let name = module.name().to_string();
        let path = module.path().to_path_buf();
        if let Some(previous) = self.all.insert(name, module) {
            debug!(
                "Module {} at {:?} replaces the one at {:?}",
                previous.name(),
                path,
                previous.path()
            );
        }
    }

    /// Split `all` by installed flag, keeping the order of `all`.
    fn partition(&mut self) {
        self.installed.clear();
        self.uninstalled.clear();
        for (name, module) in &self.all {
            if module.is_installed() {
                self.installed.insert(name.clone());
            } else {
                self.uninstalled.insert(name.clone());
            }
        }
    }

    fn names(&self, selection: Selection) -> Vec<String> {
        match selection {
            Selection::All => self.all.keys().cloned().collect(),
            Selection::Installed => self.installed.iter().cloned().collect(),
            Selection::Uninstalled => self.uninstalled.iter().cloned().collect(),
        }
    }

    fn select(&self, selection: Selection) -> Vec<&Module> {
        match selection {
            Selection::All => self.all.values().collect(),
            Selection::Installed => self.lookup(&self.installed),
            Selection::Uninstalled => self.lookup(&self.uninstalled),
        }
    }

    fn lookup(&self, names: &IndexSet<String>) -> Vec<&Module> {
        names.iter().filter_map(|n| self.all.get(n)).collect()
    }

    fn remove(&mut self, name: &str) -> Option<Module> {
        self.installed.shift_remove(name);
        self.uninstalled.shift_remove(name);
        self.all.shift_remove(name)
    }
}

/// Discovers modules in a list of directories and caches them by name.
pub struct ModuleRepository {
    ctx: HostContext,
    factory: ModuleFactory,
    policy: DiscoveryPolicy,
    dirs: Vec<PathBuf>,
    index: Option<Index>,
    failures: Vec<ManifestError>,
}

impl ModuleRepository {
    /// Create a repository that builds modules with [`Module::new`].
    pub fn new(ctx: HostContext) -> Self {
        Self::with_factory(
            ctx,
            Box::new(|path, manifest, ctx| Module::new(path, manifest, ctx.clone())),
        )
    }

    pub fn with_factory(ctx: HostContext, factory: ModuleFactory) -> Self {
        Self {
            ctx,
            factory,
            policy: DiscoveryPolicy::default(),
            dirs: Vec::new(),
            index: None,
            failures: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: DiscoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DiscoveryPolicy {
        self.policy
    }

    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    // Module directories

    /// Add a directory to scan. Adding a known directory is a no-op.
    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        let dir = dir.into();
        if !self.has_dir(&dir) {
            self.dirs.push(dir);
        }
        self
    }

    pub fn add_dirs<I, P>(&mut self, dirs: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for dir in dirs {
            self.add_dir(dir);
        }
        self
    }

    pub fn has_dir(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }

    /// Directories in the order they were added (the discovery order).
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    // Discovery

    /// Rescan every directory and rebuild the indices.
    ///
    /// Only `<dir>/module.json` is considered; subdirectories are not
    /// searched. Under [`DiscoveryPolicy::Abort`] the first bad manifest or
    /// unscannable directory fails the reload and leaves the indices
    /// unloaded.
    #[tracing::instrument(skip(self))]
    pub fn reload(&mut self) -> Result<()> {
        self.index = None;
        self.failures.clear();

        let mut found = Vec::new();
        for dir in &self.dirs {
            let pattern = manifest_pattern(dir);
            match self.ctx.runtime().glob(&pattern) {
                Ok(paths) => found.extend(paths),
                Err(e) => {
                    let e = ManifestError::Unscannable {
                        path: dir.clone(),
                        source: e.into(),
                    };
                    match self.policy {
                        DiscoveryPolicy::Abort => return Err(e.into()),
                        DiscoveryPolicy::Collect => {
                            warn!("Skipping directory: {}", e);
                            self.failures.push(e);
                        }
                    }
                }
            }
        }
        debug!("Found {} manifest(s) in {} dir(s)", found.len(), self.dirs.len());

        let mut index = Index::default();
        for manifest_path in found {
            match self.create_module(&manifest_path) {
                Ok(module) => index.insert(module),
                Err(e) => match self.policy {
                    DiscoveryPolicy::Abort => return Err(e.into()),
                    DiscoveryPolicy::Collect => {
                        warn!("Skipping module: {}", e);
                        self.failures.push(e);
                    }
                },
            }
        }
        index.partition();

        info!(
            "Loaded {} module(s): {} installed, {} uninstalled",
            index.all.len(),
            index.installed.len(),
            index.uninstalled.len()
        );
        self.index = Some(index);
        Ok(())
    }

    fn create_module(&self, manifest_path: &Path) -> Result<Module, ManifestError> {
        let manifest = read_manifest(&self.ctx, manifest_path)?;
        (self.factory)(&module_dir(manifest_path), manifest, &self.ctx)
    }

    /// Reload unless the indices have been built. An empty index counts as
    /// built.
    pub fn load_if_needed(&mut self) -> Result<()> {
        if self.index.is_none() {
            self.reload()?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// Manifests and directories skipped by the last reload under
    /// [`DiscoveryPolicy::Collect`].
    pub fn failures(&self) -> &[ManifestError] {
        &self.failures
    }

    // Lazy queries

    pub fn modules(&mut self) -> Result<Vec<&Module>> {
        self.select(Selection::All)
    }

    pub fn installed_modules(&mut self) -> Result<Vec<&Module>> {
        self.select(Selection::Installed)
    }

    pub fn uninstalled_modules(&mut self) -> Result<Vec<&Module>> {
        self.select(Selection::Uninstalled)
    }

    pub fn select(&mut self, selection: Selection) -> Result<Vec<&Module>> {
        self.load_if_needed()?;
        Ok(self
            .index
            .as_ref()
            .map(|index| index.select(selection))
            .unwrap_or_default())
    }

    /// Names in an index, in index order.
    pub fn names(&mut self, selection: Selection) -> Result<Vec<String>> {
        self.load_if_needed()?;
        Ok(self
            .index
            .as_ref()
            .map(|index| index.names(selection))
            .unwrap_or_default())
    }

    pub fn module(&mut self, name: &str) -> Result<Option<&Module>> {
        self.load_if_needed()?;
        Ok(self.get(name))
    }

    pub fn module_mut(&mut self, name: &str) -> Result<Option<&mut Module>> {
        self.load_if_needed()?;
        Ok(self.get_mut(name))
    }

    pub fn has_module(&mut self, name: &str) -> Result<bool> {
        self.load_if_needed()?;
        Ok(self.get(name).is_some())
    }

    // Snapshot access (no loading)

    /// Look up a module in the current snapshot without triggering a scan.
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.index.as_ref().and_then(|index| index.all.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.index.as_mut().and_then(|index| index.all.get_mut(name))
    }

    /// Remove a module from every index and hand it back.
    pub fn evict(&mut self, name: &str) -> Option<Module> {
        let module = self.index.as_mut().and_then(|index| index.remove(name));
        if module.is_some() {
            debug!("Evicted module {}", name);
        }
        module
    }
}

/// Glob pattern matching the manifest directly inside `dir`.
///
/// `dir` itself may contain wildcards (`modules/*`), which lets one entry
/// cover every module directory below a parent.
fn manifest_pattern(dir: &Path) -> String {
    dir.join(MANIFEST_FILE).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{ModuleFixture, context_with};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn repository_in(dirs: &[&Path]) -> ModuleRepository {
        let mut repo = ModuleRepository::new(context_with(Capabilities::new()));
        repo.add_dirs(dirs.iter().map(|d| d.to_path_buf()));
        repo
    }

    fn names(modules: Vec<&Module>) -> Vec<String> {
        modules.iter().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn test_add_dir_is_idempotent_and_ordered() {
        let mut repo = ModuleRepository::new(context_with(Capabilities::new()));
        repo.add_dir("/b").add_dir("/a").add_dir("/b");
        repo.add_dirs(["/c", "/a"]);

        assert_eq!(
            repo.dirs(),
            [PathBuf::from("/b"), PathBuf::from("/a"), PathBuf::from("/c")]
        );
        assert!(repo.has_dir(Path::new("/a")));
        assert!(!repo.has_dir(Path::new("/d")));
    }

    #[test]
    fn test_reload_partitions_by_installed_flag() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").installed(true).write();
        let shop = ModuleFixture::new(root.path(), "shop").write();

        let mut repo = repository_in(&[blog.dir(), shop.dir()]);
        repo.reload().unwrap();

        assert_eq!(names(repo.modules().unwrap()), vec!["blog", "shop"]);
        assert_eq!(names(repo.installed_modules().unwrap()), vec!["blog"]);
        assert_eq!(names(repo.uninstalled_modules().unwrap()), vec!["shop"]);
    }

    #[test]
    fn test_partition_invariant() {
        let root = tempdir().unwrap();
        let mut dirs = Vec::new();
        for (i, installed) in [true, false, true, false, false].into_iter().enumerate() {
            let fixture = ModuleFixture::new(root.path(), &format!("m{}", i))
                .installed(installed)
                .write();
            dirs.push(fixture.dir().to_path_buf());
        }
        let mut repo = ModuleRepository::new(context_with(Capabilities::new()));
        repo.add_dirs(dirs);
        repo.reload().unwrap();

        let all = names(repo.modules().unwrap());
        let installed = names(repo.installed_modules().unwrap());
        let uninstalled = names(repo.uninstalled_modules().unwrap());

        for name in &all {
            let module = repo.get(name).unwrap();
            assert_eq!(installed.contains(name), module.is_installed());
            assert_ne!(installed.contains(name), uninstalled.contains(name));
        }
        assert_eq!(installed.len() + uninstalled.len(), all.len());
    }

    #[test]
    fn test_reload_does_not_recurse() {
        let root = tempdir().unwrap();
        ModuleFixture::new(&root.path().join("nested"), "deep").write();

        let mut repo = repository_in(&[root.path()]);

        assert!(repo.modules().unwrap().is_empty());
    }

    #[test]
    fn test_lazy_load_scans_once() {
        let mut runtime = MockRuntime::new();
        runtime.expect_glob().times(1).returning(|_| Ok(vec![]));

        let ctx = HostContext::new(Arc::new(runtime), Arc::new(Capabilities::new()));
        let mut repo = ModuleRepository::new(ctx);
        repo.add_dir("/modules/blog");

        assert!(!repo.is_loaded());
        assert!(repo.modules().unwrap().is_empty());
        // empty but loaded: no second scan
        assert!(repo.installed_modules().unwrap().is_empty());
        assert!(!repo.has_module("blog").unwrap());
        assert!(repo.module("blog").unwrap().is_none());
        assert!(repo.is_loaded());
    }

    #[test]
    fn test_explicit_reload_rescans() {
        let mut runtime = MockRuntime::new();
        runtime.expect_glob().times(2).returning(|_| Ok(vec![]));

        let ctx = HostContext::new(Arc::new(runtime), Arc::new(Capabilities::new()));
        let mut repo = ModuleRepository::new(ctx);
        repo.add_dir("/modules");

        repo.modules().unwrap();
        repo.reload().unwrap();
        repo.modules().unwrap();
    }

    #[test]
    fn test_glob_pattern_per_directory() {
        let mut runtime = MockRuntime::new();
        let expected = manifest_pattern(Path::new("/modules/blog"));
        runtime
            .expect_glob()
            .withf(move |pattern| pattern.to_string() == expected)
            .times(1)
            .returning(|_| Ok(vec![]));

        let ctx = HostContext::new(Arc::new(runtime), Arc::new(Capabilities::new()));
        let mut repo = ModuleRepository::new(ctx);
        repo.add_dir("/modules/blog");
        repo.reload().unwrap();
    }

    #[test]
    fn test_wildcard_dir_expands_to_module_dirs() {
        let root = tempdir().unwrap();
        ModuleFixture::new(root.path(), "shop").write();
        ModuleFixture::new(root.path(), "blog").installed(true).write();

        let pattern = root.path().join("*");
        let mut repo = repository_in(&[pattern.as_path()]);

        // glob yields matches sorted by path
        assert_eq!(names(repo.modules().unwrap()), vec!["blog", "shop"]);
        assert_eq!(names(repo.installed_modules().unwrap()), vec!["blog"]);
    }

    #[test]
    fn test_stale_snapshot_until_reload() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").write();

        let mut repo = repository_in(&[blog.dir()]);
        let module = repo.module_mut("blog").unwrap().unwrap();
        module.set_installed(true).unwrap().save().unwrap();

        // partition is a snapshot
        assert_eq!(names(repo.uninstalled_modules().unwrap()), vec!["blog"]);
        assert!(repo.get("blog").unwrap().is_installed());

        repo.reload().unwrap();
        assert_eq!(names(repo.installed_modules().unwrap()), vec!["blog"]);
        assert!(repo.uninstalled_modules().unwrap().is_empty());
    }

    #[test]
    fn test_name_collision_last_writer_wins() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let a = ModuleFixture::new(first.path(), "blog").installed(true).write();
        let other = ModuleFixture::new(first.path(), "shop").write();
        let b = ModuleFixture::new(second.path(), "blog").write();

        let mut repo = repository_in(&[a.dir(), other.dir(), b.dir()]);
        repo.reload().unwrap();

        assert_eq!(names(repo.modules().unwrap()), vec!["blog", "shop"]);
        assert_eq!(repo.get("blog").unwrap().path(), b.dir());
        assert!(repo.installed_modules().unwrap().is_empty());
        assert_eq!(
            names(repo.uninstalled_modules().unwrap()),
            vec!["blog", "shop"]
        );
    }

    #[test_log::test]
    fn test_collect_policy_skips_bad_manifest() {
        let root = tempdir().unwrap();
        let good = ModuleFixture::new(root.path(), "good").write();
        let bad = ModuleFixture::new(root.path(), "bad")
            .field("installed", json!("yes"))
            .write();

        let mut repo = repository_in(&[bad.dir(), good.dir()]);
        repo.reload().unwrap();

        assert_eq!(names(repo.modules().unwrap()), vec!["good"]);
        assert_eq!(repo.failures().len(), 1);
        assert!(repo.failures()[0].to_string().contains("[installed]"));

        // failures are reset by the next reload
        std::fs::write(
            bad.manifest_path(),
            r#"{"name": "bad", "installed": false}"#,
        )
        .unwrap();
        repo.reload().unwrap();
        assert!(repo.failures().is_empty());
        assert_eq!(names(repo.modules().unwrap()), vec!["bad", "good"]);
    }

    #[test_log::test]
    fn test_abort_policy_fails_reload() {
        let root = tempdir().unwrap();
        let good = ModuleFixture::new(root.path(), "good").write();
        let bad = ModuleFixture::new(root.path(), "bad").without("name").write();

        let mut repo = repository_in(&[good.dir(), bad.dir()]).with_policy(DiscoveryPolicy::Abort);

        let err = repo.reload().unwrap_err();
        assert!(err.downcast_ref::<ManifestError>().is_some());
        assert!(!repo.is_loaded());
        assert!(repo.modules().is_err());
    }

    #[test]
    fn test_collision_keeps_sub_index_order() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let a = ModuleFixture::new(first.path(), "blog").write();
        let other = ModuleFixture::new(first.path(), "shop").installed(true).write();
        let b = ModuleFixture::new(second.path(), "blog").installed(true).write();

        let mut repo = repository_in(&[a.dir(), other.dir(), b.dir()]);

        assert_eq!(
            repo.names(Selection::Installed).unwrap(),
            repo.names(Selection::All).unwrap()
        );
        assert_eq!(
            repo.names(Selection::Installed).unwrap(),
            vec!["blog", "shop"]
        );
        assert!(repo.names(Selection::Uninstalled).unwrap().is_empty());
    }

    #[test_log::test]
    fn test_collect_policy_skips_unscannable_dir() {
        let root = tempdir().unwrap();
        let good = ModuleFixture::new(root.path(), "good").write();
        let broken = root.path().join("broken[");

        let mut repo = repository_in(&[good.dir(), broken.as_path()]);
        repo.reload().unwrap();

        assert!(repo.is_loaded());
        assert_eq!(names(repo.modules().unwrap()), vec!["good"]);
        assert_eq!(repo.failures().len(), 1);
        assert!(matches!(
            repo.failures()[0],
            ManifestError::Unscannable { .. }
        ));
        assert_eq!(repo.failures()[0].path(), &broken);
    }

    #[test_log::test]
    fn test_abort_policy_fails_on_unscannable_dir() {
        let root = tempdir().unwrap();
        let good = ModuleFixture::new(root.path(), "good").write();
        let broken = root.path().join("broken[");

        let mut repo = repository_in(&[good.dir(), broken.as_path()])
            .with_policy(DiscoveryPolicy::Abort);

        let err = repo.reload().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ManifestError>(),
            Some(ManifestError::Unscannable { .. })
        ));
        assert!(!repo.is_loaded());
    }

    #[test]
    fn test_malformed_json_is_manifest_error() {
        let root = tempdir().unwrap();
        let dir = root.path().join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), "{").unwrap();

        let mut repo = repository_in(&[dir.as_path()]);
        repo.reload().unwrap();

        assert!(matches!(
            repo.failures()[0],
            ManifestError::Malformed { .. }
        ));
    }

    #[test]
    fn test_custom_factory() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").write();

        let factory: ModuleFactory = Box::new(|path, mut manifest, ctx| {
            manifest["installed"] = json!(true);
            Module::new(path, manifest, ctx.clone())
        });
        let mut repo = ModuleRepository::with_factory(context_with(Capabilities::new()), factory);
        repo.add_dir(blog.dir());

        assert_eq!(names(repo.installed_modules().unwrap()), vec!["blog"]);
    }

    #[test]
    fn test_evict_removes_from_every_index() {
        let root = tempdir().unwrap();
        let blog = ModuleFixture::new(root.path(), "blog").installed(true).write();
        let shop = ModuleFixture::new(root.path(), "shop").write();

        let mut repo = repository_in(&[blog.dir(), shop.dir()]);
        repo.load_if_needed().unwrap();

        let evicted = repo.evict("blog").unwrap();
        assert_eq!(evicted.name(), "blog");
        assert!(repo.evict("blog").is_none());

        assert!(!repo.has_module("blog").unwrap());
        assert!(repo.installed_modules().unwrap().is_empty());
        assert_eq!(names(repo.modules().unwrap()), vec!["shop"]);
    }

    #[test]
    fn test_names_follow_index_order() {
        let root = tempdir().unwrap();
        let c = ModuleFixture::new(root.path(), "c").installed(true).write();
        let a = ModuleFixture::new(root.path(), "a").write();
        let b = ModuleFixture::new(root.path(), "b").installed(true).write();

        let mut repo = repository_in(&[c.dir(), a.dir(), b.dir()]);

        assert_eq!(repo.names(Selection::All).unwrap(), vec!["c", "a", "b"]);
        assert_eq!(repo.names(Selection::Installed).unwrap(), vec!["c", "b"]);
        assert_eq!(repo.names(Selection::Uninstalled).unwrap(), vec!["a"]);
    }
}
