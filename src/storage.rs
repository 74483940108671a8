//! Durable storage of whole databases.
//!
//! The store never touches files itself: it loads a [Database], mutates it and
//! hands it back through a [Storage] implementation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;

use tracing::debug;

use crate::config::StoreConfig;
use crate::database::Database;
use crate::error::{Error, Result};

/// Persistence collaborator of the database store.
pub trait Storage {
    /// Returns true if a database called `name` is stored.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Loads the stored database `name`.
    ///
    /// # Errors
    /// [Error::DatabaseNotFound] if nothing is stored under `name`.
    fn load(&self, name: &str) -> Result<Database>;

    /// Stores `database`, replacing any previous version.
    fn persist(&self, database: &Database) -> Result<()>;

    /// Removes the stored database `name`.
    ///
    /// # Errors
    /// [Error::DatabaseNotFound] if nothing is stored under `name`.
    fn remove(&self, name: &str) -> Result<()>;

    /// Names of all stored databases, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// Database names become file names, so they must not be empty nor reach
/// outside the storage root.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if !is_valid_name(name) {
        return Err(Error::InvalidDatabaseName(name.to_string()));
    }
    Ok(())
}

/// File-based storage: one JSON document per database.
///
/// # Directory Structure
///
/// ```text
/// <root>/
/// ├── shop.json
/// └── school.json
/// ```
#[derive(Debug)]
pub struct JsonFileStorage {
    config: StoreConfig,
}

impl JsonFileStorage {
    /// Creates the storage, creating the root directory if it is missing.
    pub fn new(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl Storage for JsonFileStorage {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.config.database_path(name).try_exists()?)
    }

    fn load(&self, name: &str) -> Result<Database> {
        let path = self.config.database_path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DatabaseNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), bytes = text.len(), "loaded database document");
        Database::from_json(name, &text)
    }

    fn persist(&self, database: &Database) -> Result<()> {
        let path = self.config.database_path(database.name());
        let text = database.to_json(self.config.pretty)?;
        fs::write(&path, &text)?;
        debug!(path = %path.display(), bytes = text.len(), "persisted database document");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.config.database_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::DatabaseNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_valid_name(stem) => names.push(stem.to_string()),
                _ => {}
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory storage keeping each database as its serialized document.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.documents.borrow().contains_key(name))
    }

    fn load(&self, name: &str) -> Result<Database> {
        let documents = self.documents.borrow();
        let text = documents
            .get(name)
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))?;
        Database::from_json(name, text)
    }

    fn persist(&self, database: &Database) -> Result<()> {
        let text = database.to_json(false)?;
        self.documents
            .borrow_mut()
            .insert(database.name().to_string(), text);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.documents
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.documents.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Database {
        let mut db = Database::new("shop");
        db.create_table("items", ["name:string", "price:float"])
            .unwrap();
        db.insert("items", &["Pen", "1.0"]).unwrap();
        db
    }

    fn check_storage(storage: &impl Storage) {
        assert!(!storage.exists("shop").unwrap());
        assert!(matches!(
            storage.load("shop"),
            Err(Error::DatabaseNotFound(_))
        ));

        storage.persist(&sample()).unwrap();
        storage.persist(&Database::new("archive")).unwrap();
        assert!(storage.exists("shop").unwrap());
        assert_eq!(storage.list().unwrap(), vec!["archive", "shop"]);

        let loaded = storage.load("shop").unwrap();
        assert_eq!(loaded.name(), "shop");
        assert_eq!(loaded.get_table("items").unwrap().row_count, 1);

        storage.remove("shop").unwrap();
        assert!(matches!(
            storage.remove("shop"),
            Err(Error::DatabaseNotFound(_))
        ));
        assert_eq!(storage.list().unwrap(), vec!["archive"]);
    }

    #[test]
    fn test_memory_storage() {
        check_storage(&MemoryStorage::new());
    }

    #[test]
    fn test_file_storage() {
        let tmp = TempDir::new().unwrap();
        check_storage(&JsonFileStorage::new(StoreConfig::new(tmp.path())).unwrap());
    }

    #[test]
    fn test_file_storage_creates_root_and_ignores_other_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested").join("data");
        let storage = JsonFileStorage::new(StoreConfig::new(&root)).unwrap();
        assert!(root.is_dir());

        fs::write(root.join("notes.txt"), "hello").unwrap();
        fs::write(root.join(".hidden.json"), "{}").unwrap();
        storage.persist(&Database::new("a")).unwrap();
        assert_eq!(storage.list().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_file_storage_pretty_output() {
        let tmp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(StoreConfig::new(tmp.path())).unwrap();
        storage.persist(&sample()).unwrap();

        let text = fs::read_to_string(tmp.path().join("shop.json")).unwrap();
        assert!(text.contains('\n'));
        assert!(text.contains("\"price\": 1.0"));

        let compact = JsonFileStorage::new(StoreConfig::new(tmp.path()).with_pretty(false)).unwrap();
        compact.persist(&sample()).unwrap();
        let text = fs::read_to_string(tmp.path().join("shop.json")).unwrap();
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_file_storage_corrupt_document() {
        let tmp = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(StoreConfig::new(tmp.path())).unwrap();
        fs::write(tmp.path().join("bad.json"), "[1, 2]").unwrap();

        let err = storage.load("bad").unwrap_err();
        assert!(matches!(err, Error::CorruptDocument(_)));
    }
}
