use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plugman")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Install and manage plugins", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Plugins directory (overrides PLUGMAN_PLUGINS_DIR and config.toml)
    #[arg(long, global = true, value_name = "DIR")]
    pub plugins_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install a plugin from a path, archive URL or git repository
    Install(InstallArgs),

    /// Update installed plugins
    Update {
        /// Plugin names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove installed plugins
    Uninstall {
        /// Plugin names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List installed plugins
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the installation directory of a plugin
    Path {
        /// Plugin name
        name: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Install
// ============================================================================

#[derive(Parser)]
pub struct InstallArgs {
    /// Local directory or archive, archive URL, or git repository
    pub source: String,

    /// Version to install (exact version or semver requirement for git)
    #[arg(long)]
    pub version: Option<String>,
}
