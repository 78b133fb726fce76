use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod server_properties;

use commands::{restore, snapshot};

#[derive(Parser)]
#[command(name = "ember", version)]
#[command(about = "Snapshot and restore Minecraft server worlds", long_about = None)]
struct Cli {
    /// Server directory holding server.properties and the worlds
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Config file, defaults to ember.toml in the server directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive a world into the backup directory
    Snapshot(snapshot::SnapshotArgs),
    /// Restore a world from a stored backup
    Restore(restore::RestoreArgs),
    /// List stored world backups
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let server = commands::Server::open(&cli.root, cli.config.as_deref())?;

    match cli.command {
        Commands::Snapshot(args) => snapshot::run(&server, args).await,
        Commands::Restore(args) => restore::run(&server, args).await,
        Commands::List => commands::list::run(&server),
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn restore_defaults_to_no_overwrite() {
        let cli = Cli::try_parse_from(["ember", "restore", "World"]).expect("parse restore");
        let Commands::Restore(args) = cli.command else {
            panic!("expected restore");
        };
        assert_eq!(args.backup.as_deref(), Some("World"));
        assert_eq!(args.target, None);
        assert!(!args.overwrite);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["ember", "snapshot", "--root", "/srv/mc"])
            .expect("parse snapshot");
        assert_eq!(cli.root, std::path::PathBuf::from("/srv/mc"));
        assert!(matches!(cli.command, Commands::Snapshot(_)));
    }
}
