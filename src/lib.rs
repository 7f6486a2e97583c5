pub mod boot;
pub mod capability;
pub mod commands;
pub mod context;
pub mod manager;
pub mod module;
pub mod repository;
pub mod runtime;

pub use context::HostContext;
pub use manager::{ModuleManager, RemovalPolicy};
pub use module::{MANIFEST_FILE, ManifestError, Module};
pub use repository::{DiscoveryPolicy, ModuleRepository, Selection};
