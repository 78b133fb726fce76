use std::path::{Path, PathBuf};

/// Host-side lookup from a world name to its directory on disk.
pub trait ContentRootResolver: Send + Sync {
    /// `None` when the host knows no world by that name.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Treats every directory directly under `dir` as a world of the same name.
#[derive(Debug, Clone)]
pub struct WorldsDirectory {
    dir: PathBuf,
}

impl WorldsDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ContentRootResolver for WorldsDirectory {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = self.dir.join(name);
        path.is_dir().then_some(path)
    }
}

impl<F> ContentRootResolver for F
where
    F: Fn(&str) -> Option<PathBuf> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentRootResolver, WorldsDirectory};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn resolves_only_existing_directories() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("ember-resolver-{nanos}"));
        std::fs::create_dir_all(dir.join("world")).expect("create world");
        std::fs::write(dir.join("server.jar"), b"jar").expect("write jar");

        let worlds = WorldsDirectory::new(&dir);
        assert_eq!(worlds.resolve("world"), Some(dir.join("world")));
        assert_eq!(worlds.resolve("server.jar"), None);
        assert_eq!(worlds.resolve("world_nether"), None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn closures_act_as_resolvers() {
        let resolver = |name: &str| (name == "lobby").then(|| PathBuf::from("/srv/lobby"));
        assert_eq!(resolver.resolve("lobby"), Some(PathBuf::from("/srv/lobby")));
        assert_eq!(resolver.resolve("arena"), None);
    }
}
