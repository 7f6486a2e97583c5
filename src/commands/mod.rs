//! Command implementations behind the `modhost` binary.

pub mod config;
mod boot;
mod hook_spec;
mod install;
mod list;
mod remove;
mod show;

pub use boot::boot_plan;
pub use hook_spec::HookSpec;
pub use install::{install, uninstall};
pub use list::list;
pub use remove::{RemoveTarget, remove};
pub use show::show;
