use anyhow::{Context, Result};
use clap::Args;

use super::Server;

#[derive(Args)]
pub struct SnapshotArgs {
    /// World to archive, defaults to level-name from server.properties
    pub world: Option<String>,
}

pub async fn run(server: &Server, args: SnapshotArgs) -> Result<()> {
    let world = super::name_or_level_name(&server.root, args.world)?;

    let location = server
        .manager
        .snapshot_async(&world)
        .await
        .with_context(|| format!("Failed to back up world '{world}'"))?;

    println!(
        "Saved world '{}' to {} ({} files, {})",
        world,
        location.path.display(),
        location.entries,
        super::list::format_size(location.bytes)
    );
    Ok(())
}
