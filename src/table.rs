use std::str::FromStr;

use bitvec::prelude::*;

use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl FromStr for ColumnDef {
    type Err = Error;

    /// Parses a `name:type` token. The token is split on its first colon,
    /// both halves are trimmed and the type name is case-insensitive.
    fn from_str(token: &str) -> Result<Self> {
        let (name, data_type) = token
            .split_once(':')
            .ok_or_else(|| Error::InvalidColumnSyntax(token.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidColumnSyntax(token.to_string()));
        }
        Ok(ColumnDef {
            name: name.to_string(),
            data_type: data_type.parse()?,
        })
    }
}

/// Ordered column definitions of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Builds a schema from already typed column definitions.
    ///
    /// # Errors
    /// [Error::DuplicateColumn] if two columns share a name.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Builds a schema from `name:type` tokens, keeping their order.
    ///
    /// # Example
    /// ```
    /// use flatdb::{DataType, Schema};
    ///
    /// let schema = Schema::from_definitions(["id:integer", " name : STRING "]).unwrap();
    /// assert_eq!(schema.names(), vec!["id", "name"]);
    /// assert_eq!(schema.columns[1].data_type, DataType::Text);
    /// ```
    ///
    /// # Errors
    /// [Error::InvalidColumnSyntax], [Error::UnsupportedType] or [Error::DuplicateColumn].
    pub fn from_definitions<I, S>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = definitions
            .into_iter()
            .map(|token| token.as_ref().parse::<ColumnDef>())
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Position of `name` in schema order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Like [Schema::position], but a missing column is an [Error::UnknownColumn].
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Column names in schema order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A named table: its schema and its rows, stored column by column.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub columns: Vec<Column>,
    pub row_count: usize,
}

impl Table {
    pub fn new(name: String, schema: Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|column| Column::new(column.name.clone(), column.data_type))
            .collect();
        Self {
            name,
            schema,
            columns,
            row_count: 0,
        }
    }

    /// Appends a fully typed row.
    ///
    /// The whole row is checked before any column is touched, so a failure
    /// leaves the table unchanged.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.schema.len() {
            return Err(Error::ColumnCountMismatch {
                table: self.name.clone(),
                expected: self.schema.len(),
                found: values.len(),
            });
        }
        for (value, def) in values.iter().zip(&self.schema.columns) {
            if value.data_type() != def.data_type {
                return Err(Error::type_mismatch(value.to_string(), def.data_type));
            }
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Returns the row at `row_idx`, one value per column in schema order.
    pub fn get_row(&self, row_idx: usize) -> Option<Vec<Value>> {
        if self.row_count <= row_idx {
            return None;
        }
        self.columns
            .iter()
            .map(|col| col.get(row_idx))
            .collect()
    }

    /// Iterates over all rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.row_count).filter_map(|i| self.get_row(i))
    }

    /// Removes the rows whose bit is set in `doomed`, keeping the others in order.
    /// Returns how many rows were removed.
    pub fn delete_rows(&mut self, doomed: &BitSlice) -> usize {
        let removed = doomed.count_ones();
        if removed == 0 {
            return 0;
        }
        let keep = !doomed.to_bitvec();
        for column in &mut self.columns {
            column.retain(&keep);
        }
        self.row_count -= removed;
        removed
    }

    /// Removes every row. Returns how many rows the table held.
    pub fn clear(&mut self) -> usize {
        let removed = self.row_count;
        for column in &mut self.columns {
            column.clear();
        }
        self.row_count = 0;
        removed
    }
}
