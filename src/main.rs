mod cli;
mod commands;
mod config;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Config;
use installer::Resolver;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub plugins_dir: PathBuf,
    pub config: Config,
}

impl Context {
    /// Resolver for the plugins directory, using the configured HTTP settings
    pub fn resolver(&self) -> Resolver {
        Resolver::new(&self.plugins_dir).with_getter(Arc::new(self.config.http_getter()))
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(err) = run(cli) {
        ui::report(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "plugman", &mut io::stdout());
        return Ok(());
    }

    let config = Config::load()?;
    let plugins_dir = match cli.plugins_dir {
        Some(dir) => dir,
        None => paths::plugins_dir(&config)?,
    };
    log::debug!("Plugins directory: {}", plugins_dir.display());

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        plugins_dir,
        config,
    };

    match cli.command {
        Command::Install(args) => {
            commands::plugin::install(&ctx, &args.source, args.version.as_deref())
        }
        Command::Update { names } => commands::plugin::update(&ctx, &names),
        Command::Uninstall { names } => commands::plugin::uninstall(&ctx, &names),
        Command::List { json } => commands::plugin::list(&ctx, json),
        Command::Path { name } => commands::plugin::path(&ctx, &name),
        Command::Completions { .. } => Ok(()),
    }
}
