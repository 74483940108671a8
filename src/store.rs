//! The database store: named databases kept in a [Storage], and table
//! operations run through a load, mutate, persist cycle.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::database::{Database, QueryResult};
use crate::error::{Error, Result};
use crate::query::Select;
use crate::storage::{Storage, validate_name};
use crate::table::Table;

/// Entry point for callers: owns the storage and hands out transactions.
///
/// # Example
/// ```
/// use flatdb::{DatabaseStore, MemoryStorage, Select};
///
/// let store = DatabaseStore::new(MemoryStorage::new());
/// store.create_database("school").unwrap();
/// store.create_table("school", "students", &["name:string", "age:integer"]).unwrap();
/// store.insert("school", "students", &["Ada", "21"]).unwrap();
///
/// let result = store.select("school", "students", &Select::all().filter("age > 20")).unwrap();
/// assert_eq!(result.rows.len(), 1);
/// ```
#[derive(Debug)]
pub struct DatabaseStore<S: Storage> {
    storage: S,
}

impl<S: Storage> DatabaseStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Creates an empty database and persists it.
    ///
    /// # Errors
    /// [Error::InvalidDatabaseName], [Error::DatabaseAlreadyExists], or a persistence error.
    pub fn create_database(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.storage.exists(name)? {
            return Err(Error::DatabaseAlreadyExists(name.to_string()));
        }
        self.storage.persist(&Database::new(name))?;
        info!(database = name, "created database");
        Ok(())
    }

    /// Deletes a database and everything in it.
    pub fn delete_database(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.storage.remove(name)?;
        info!(database = name, "deleted database");
        Ok(())
    }

    pub fn database_exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        self.storage.exists(name)
    }

    /// Names of all databases, sorted.
    pub fn list_databases(&self) -> Result<Vec<String>> {
        self.storage.list()
    }

    /// Loads database `name` into a transaction owning an in-memory copy.
    ///
    /// # Errors
    /// [Error::DatabaseNotFound] or a persistence error.
    pub fn begin(&self, name: &str) -> Result<Transaction<'_, S>> {
        validate_name(name)?;
        let database = self.storage.load(name)?;
        debug!(database = name, "began transaction");
        Ok(Transaction {
            storage: &self.storage,
            database,
            dirty: false,
        })
    }

    /// Runs `op` against a fresh copy of `name` and commits the result.
    /// A failing `op` discards the copy without persisting.
    fn mutate<T>(&self, name: &str, op: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut tx = self.begin(name)?;
        match op(tx.database_mut()) {
            Ok(out) => {
                tx.commit()?;
                Ok(out)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    fn read<T>(&self, name: &str, op: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        validate_name(name)?;
        op(&self.storage.load(name)?)
    }

    pub fn create_table<T: AsRef<str>>(&self, db: &str, table: &str, definitions: &[T]) -> Result<()> {
        self.mutate(db, |d| d.create_table(table, definitions))
    }

    pub fn drop_table(&self, db: &str, table: &str) -> Result<()> {
        self.mutate(db, |d| d.drop_table(table))
    }

    /// Names of the tables of `db`, sorted.
    pub fn list_tables(&self, db: &str) -> Result<Vec<String>> {
        self.read(db, |d| Ok(d.list_tables().into_iter().map(String::from).collect()))
    }

    pub fn insert<T: AsRef<str>>(&self, db: &str, table: &str, raw_values: &[T]) -> Result<()> {
        self.mutate(db, |d| d.insert(table, raw_values))
    }

    pub fn select(&self, db: &str, table: &str, select: &Select) -> Result<QueryResult> {
        self.read(db, |d| d.select(table, select))
    }

    /// Returns the number of updated rows.
    pub fn update<T: AsRef<str>>(
        &self,
        db: &str,
        table: &str,
        assignments: &[T],
        condition: Option<&str>,
    ) -> Result<usize> {
        self.mutate(db, |d| d.update(table, assignments, condition))
    }

    /// Returns the number of deleted rows.
    pub fn delete(&self, db: &str, table: &str, condition: Option<&str>) -> Result<usize> {
        self.mutate(db, |d| d.delete(table, condition))
    }

    /// Writes one table as a standalone `{"columns": ..., "rows": ...}` document.
    pub fn export_table(&self, db: &str, table: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.read(db, |d| {
            d.get_table(table)
                .ok_or_else(|| Error::TableNotFound(table.to_string()))?
                .to_json(true)
        })?;
        fs::write(path, text)?;
        info!(database = db, table, path = %path.display(), "exported table");
        Ok(())
    }

    /// Writes the whole database document to `path`.
    pub fn export_database(&self, db: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.read(db, |d| d.to_json(true))?;
        fs::write(path, text)?;
        info!(database = db, path = %path.display(), "exported database");
        Ok(())
    }

    /// Reads a table document written by [DatabaseStore::export_table] and
    /// installs it as `table`. Returns the number of imported rows.
    ///
    /// # Errors
    /// [Error::TableAlreadyExists] if the name is taken, [Error::CorruptDocument]
    /// if the file does not describe a valid table.
    pub fn import_table(&self, db: &str, table: &str, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let imported = Table::from_json(table, &fs::read_to_string(path)?)?;
        let rows = imported.row_count;
        self.mutate(db, |d| d.add_table(imported))?;
        info!(database = db, table, rows, path = %path.display(), "imported table");
        Ok(rows)
    }
}

/// An exclusively owned, in-memory copy of one database.
///
/// Changes become durable on [Transaction::commit]. Dropping a transaction
/// without committing discards its changes.
#[derive(Debug)]
pub struct Transaction<'a, S: Storage> {
    storage: &'a S,
    database: Database,
    dirty: bool,
}

impl<S: Storage> Transaction<'_, S> {
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Mutable access to the copy. The transaction is considered modified from here on.
    pub fn database_mut(&mut self) -> &mut Database {
        self.dirty = true;
        &mut self.database
    }

    /// Persists the copy.
    ///
    /// On failure the copy and its changes stay in the transaction, so the
    /// commit can be retried.
    pub fn commit(&mut self) -> Result<()> {
        self.storage.persist(&self.database)?;
        self.dirty = false;
        debug!(database = %self.database.name(), "committed transaction");
        Ok(())
    }

    /// Discards the copy without persisting it.
    pub fn rollback(mut self) {
        self.dirty = false;
    }
}

impl<S: Storage> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if self.dirty {
            warn!(database = %self.database.name(), "dropping uncommitted changes");
        }
    }
}
