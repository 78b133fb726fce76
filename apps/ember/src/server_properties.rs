use std::path::Path;

use anyhow::{Context, Result};

const DEFAULT_LEVEL_NAME: &str = "world";

/// The world the server loads on start, `world` when unset.
pub fn read_level_name(root: &Path) -> Result<String> {
    let path = root.join("server.properties");
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    Ok(get_property(&contents, "level-name")
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL_NAME.to_string()))
}

fn get_property(contents: &str, key: &str) -> Option<String> {
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let Some((name, value)) = trimmed.split_once(['=', ':']) else {
            continue;
        };
        if name.trim() == key {
            return Some(value.trim().to_string());
        }
    }
    None
}
