use anyhow::{Context, Result};
use clap::Args;

use super::Server;

#[derive(Args)]
pub struct RestoreArgs {
    /// Backup to restore, defaults to level-name from server.properties
    pub backup: Option<String>,
    /// World to restore into, defaults to the backup's name
    #[arg(long = "as")]
    pub target: Option<String>,
    /// Replace an existing world that carries the marker files
    #[arg(long)]
    pub overwrite: bool,
}

pub async fn run(server: &Server, args: RestoreArgs) -> Result<()> {
    let backup = super::name_or_level_name(&server.root, args.backup)?;
    let world = args.target.unwrap_or_else(|| backup.clone());

    let summary = server
        .manager
        .restore_async(&backup, &world, args.overwrite)
        .await
        .with_context(|| format!("Failed to restore backup '{backup}' into world '{world}'"))?;

    println!(
        "Restored '{}' into {} ({} files, {})",
        backup,
        server.manager.worlds_dir().join(&world).display(),
        summary.entries,
        super::list::format_size(summary.bytes)
    );
    Ok(())
}
