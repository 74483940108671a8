use std::path::{Path, PathBuf};

/// Configuration for on-disk database storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one `<name>.json` document per database.
    pub root: PathBuf,
    /// Whether documents are written as indented JSON.
    pub pretty: bool,
}

impl StoreConfig {
    /// Creates a new storage configuration rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pretty: true,
        }
    }

    /// Sets whether documents are written as indented JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Path of the document backing database `name`.
    pub fn database_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("./flatdb_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new("/tmp/data").with_pretty(false);
        assert_eq!(config.root, PathBuf::from("/tmp/data"));
        assert!(!config.pretty);
        assert_eq!(
            config.database_path("shop"),
            PathBuf::from("/tmp/data/shop.json")
        );
        assert!(StoreConfig::default().pretty);
    }
}
