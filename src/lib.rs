//! A flat-file, schema-typed record store.
//!
//! Each database is a named collection of tables; each table has a fixed
//! column/type schema and typed rows kept column by column. Databases are
//! persisted whole, one JSON document each, through a [Storage].

pub mod column;
pub mod condition;
pub mod config;
pub mod data_type;
pub mod database;
mod document;
pub mod error;
pub mod query;
pub mod shell;
pub mod storage;
pub mod store;
pub mod table;
pub mod value;

pub use column::Column;
pub use config::StoreConfig;
pub use data_type::DataType;
pub use database::{Database, QueryResult};
pub use error::{Error, Result};
pub use query::{ColumnsSelect, Select, SortDirection};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::{DatabaseStore, Transaction};
pub use table::{ColumnDef, Schema, Table};
pub use value::Value;
