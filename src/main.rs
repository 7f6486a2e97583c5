use anyhow::Result;
use clap::Parser;
use modhost::commands::{self, HookSpec, RemoveTarget, config::Config};
use modhost::{RemovalPolicy, Selection};
use std::path::PathBuf;
use std::sync::Arc;

/// modhost - module registry and lifecycle manager
///
/// Discover modules (directories holding a module.json manifest), and
/// install, uninstall, remove or boot them.
///
/// Module directories come from --dir, or MODHOST_DIRS, or
/// <data dir>/modhost/modules. A directory entry may contain glob wildcards.
///
/// Examples:
///   modhost --dir 'modules/*' list
///   modhost --dir 'modules/*' --hook Setup=./setup.sh install blog
#[derive(Parser, Debug)]
#[command(author, version = env!("MODHOST_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Module directory (repeatable)
    #[arg(long = "dir", short = 'd', value_name = "PATH", global = true)]
    pub dirs: Vec<PathBuf>,

    /// Fail on the first invalid manifest instead of skipping it (also via MODHOST_STRICT)
    #[arg(long, env = "MODHOST_STRICT", global = true)]
    pub strict: bool,

    /// Register PROGRAM as installer and uninstaller under ID (repeatable)
    #[arg(long = "hook", value_name = "ID=PROGRAM", global = true)]
    pub hooks: Vec<HookSpec>,

    /// Register a service provider under ID (repeatable)
    #[arg(long = "provider", value_name = "ID", global = true)]
    pub providers: Vec<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List discovered modules
    List(ListArgs),

    /// Show detailed information about a module
    Show(ShowArgs),

    /// Install a module, or every uninstalled module
    Install(LifecycleArgs),

    /// Uninstall a module, or every installed module
    Uninstall(LifecycleArgs),

    /// Uninstall modules and drop them from the registry
    Remove(RemoveArgs),

    /// Activate installed modules and print the activation plan
    Boot,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only installed modules
    #[arg(long, conflicts_with = "uninstalled")]
    pub installed: bool,

    /// Only uninstalled modules
    #[arg(long)]
    pub uninstalled: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Module name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct LifecycleArgs {
    /// Module name
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Apply to every eligible module
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Module name
    #[arg(required_unless_present_any = ["all", "installed", "uninstalled"])]
    pub name: Option<String>,

    /// Remove every module
    #[arg(long, conflicts_with_all = ["name", "installed", "uninstalled"])]
    pub all: bool,

    /// Remove every installed module
    #[arg(long, conflicts_with_all = ["name", "uninstalled"])]
    pub installed: bool,

    /// Remove every uninstalled module
    #[arg(long, conflicts_with = "name")]
    pub uninstalled: bool,

    /// Delete module directories as well
    #[arg(long)]
    pub purge: bool,
}

impl ListArgs {
    fn selection(&self) -> Selection {
        if self.installed {
            Selection::Installed
        } else if self.uninstalled {
            Selection::Uninstalled
        } else {
            Selection::All
        }
    }
}

impl RemoveArgs {
    fn target(&self) -> RemoveTarget {
        match &self.name {
            Some(name) => RemoveTarget::Name(name.clone()),
            None if self.installed => RemoveTarget::Each(Selection::Installed),
            None if self.uninstalled => RemoveTarget::Each(Selection::Uninstalled),
            None => RemoveTarget::Each(Selection::All),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = Arc::new(modhost::runtime::RealRuntime);

    let mut config = Config::new(&*runtime, cli.dirs, cli.strict)?
        .with_components(cli.hooks, cli.providers);
    if matches!(&cli.command, Commands::Remove(args) if args.purge) {
        config = config.with_removal(RemovalPolicy::DeleteDirectory);
    }
    let mut manager = config.manager(runtime);

    match cli.command {
        Commands::List(args) => commands::list(&mut manager, args.selection())?,
        Commands::Show(args) => commands::show(&mut manager, &args.name)?,
        Commands::Install(args) => commands::install(&mut manager, args.name.as_deref())?,
        Commands::Uninstall(args) => commands::uninstall(&mut manager, args.name.as_deref())?,
        Commands::Remove(args) => commands::remove(&mut manager, args.target())?,
        Commands::Boot => {
            commands::boot_plan(&mut manager)?;
        }
    }
    Ok(())
}
