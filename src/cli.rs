//! Command-line surface

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{Settings, config_dir};
use crate::manager::VersionManager;
use crate::store::Scope;

#[derive(Debug, Parser)]
#[command(name = "npmv")]
#[command(version, about = "Install and switch between npm versions")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install a version: exact, range, `latest` or `match`
    Install {
        #[arg(default_value = "latest")]
        spec: String,
    },
    /// Remove an installed version
    #[command(alias = "rm")]
    Uninstall { spec: String },
    /// Select a version for this directory, or globally with --global
    Use {
        spec: String,
        #[arg(short, long)]
        global: bool,
    },
    /// Show the selection in effect here and what it resolves to
    Current,
    /// List installed versions
    #[command(alias = "list")]
    Ls,
    /// List versions available for install
    LsRemote,
    /// Print the path of the npm CLI script
    Which { spec: Option<String> },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    let dir = config_dir();
    let settings = Settings::load(&dir)?;
    let manager = VersionManager::new(&dir, &settings);
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;

    match command {
        Command::Install { spec } => {
            let version = manager.install(&spec).await?;
            println!("{version}");
        }
        Command::Uninstall { spec } => {
            let version = manager.uninstall(&spec).await?;
            println!("{version}");
        }
        Command::Use { spec, global } => {
            let scope = if global { Scope::Global } else { Scope::Local };
            let version = manager.use_version(&spec, scope, &cwd).await?;
            println!("{version}");
        }
        Command::Current => {
            let current = manager.current(&cwd).await?;
            let note = if current.installed { "" } else { " (not installed)" };
            println!(
                "{}{} from {}",
                current.version,
                note,
                current.active.path.display()
            );
        }
        Command::Ls => print_installed(&manager, &cwd).await?,
        Command::LsRemote => {
            for version in manager.list_remote().await? {
                println!("{version}");
            }
        }
        Command::Which { spec } => {
            let path = manager.which(spec.as_deref(), &cwd).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

async fn print_installed(manager: &VersionManager, cwd: &Path) -> anyhow::Result<()> {
    let active = manager.current(cwd).await.ok().map(|c| c.version);
    for version in manager.list_installed().await? {
        let marker = if active.as_deref() == Some(version.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {version}");
    }
    Ok(())
}
