use anyhow::{Context, Result};

use super::Server;

pub fn run(server: &Server) -> Result<()> {
    let archives = server
        .manager
        .list()
        .context("Failed to list world backups")?;

    if archives.is_empty() {
        println!(
            "No world backups in {}",
            server.manager.store().root().display()
        );
        return Ok(());
    }

    let width = archives
        .iter()
        .map(|archive| archive.name.len())
        .max()
        .unwrap_or(0);
    for archive in archives {
        println!(
            "{:<width$}  {:>10}  {}",
            archive.name,
            format_size(archive.size),
            archive.path.display(),
        );
    }
    Ok(())
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::format_size;

    #[test]
    fn sizes_pick_a_readable_unit() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
