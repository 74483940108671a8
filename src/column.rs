use std::sync::Arc;

use bitvec::prelude::*;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous memory
/// allocation (columnar storage).
#[derive(Debug, Clone)]
pub enum ColumnData {
    /// Vector of 64-bit integers.
    Int(Vec<i64>),
    /// Vector of 64-bit floats.
    Float(Vec<f64>),
    /// Vector of reference-counted strings.
    Text(Vec<Arc<str>>),
    /// Compact bit-vector for boolean values.
    Bool(BitVec),
}

/// Represents a column within a table: its metadata (name, type) and its values.
#[derive(Debug, Clone)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The logical data type of the column.
    pub data_type: DataType,
    /// The actual values stored in the column.
    pub data: ColumnData,
}

impl Column {
    /// Creates a new, empty column with the specified name and data type.
    /// The underlying data storage is initialized according to the data type.
    pub fn new(name: String, data_type: DataType) -> Self {
        let data = match data_type {
            DataType::Int => ColumnData::Int(vec![]),
            DataType::Float => ColumnData::Float(vec![]),
            DataType::Bool => ColumnData::Bool(bitvec!()),
            DataType::Text => ColumnData::Text(vec![]),
        };
        Self {
            name,
            data_type,
            data,
        }
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Returns [Error::TypeMismatch] if the value's type does not match the column's data type.
    ///
    /// # Example
    /// ```
    /// # use flatdb::column::Column;
    /// # use flatdb::{DataType, Value};
    /// let mut col = Column::new("age".into(), DataType::Int);
    /// col.push(Value::Int(30)).unwrap();
    /// col.push(Value::Int(25)).unwrap();
    ///
    /// assert_eq!(col.len(), 2);
    /// assert_eq!(col.get(1), Some(Value::Int(25)));
    /// ```
    pub fn push(&mut self, value: Value) -> Result<()> {
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col.push(v),
            (ColumnData::Float(col), Value::Float(v)) => col.push(v),
            (ColumnData::Text(col), Value::Text(v)) => col.push(v),
            (ColumnData::Bool(col), Value::Bool(v)) => col.push(v),
            (_, value) => return Err(Error::type_mismatch(value.to_string(), self.data_type)),
        }
        Ok(())
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int(col) => col.len(),
            ColumnData::Float(col) => col.len(),
            ColumnData::Text(col) => col.len(),
            ColumnData::Bool(col) => col.len(),
        }
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves the value at the specified row index.
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn get(&self, row_idx: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Int(col) => col.get(row_idx).map(|v| Value::Int(*v)),
            ColumnData::Float(col) => col.get(row_idx).map(|v| Value::Float(*v)),
            ColumnData::Text(col) => col.get(row_idx).map(|v| Value::Text(Arc::clone(v))),
            ColumnData::Bool(col) => col.get(row_idx).map(|v| Value::Bool(*v)),
        }
    }

    /// Replace a value in the column by a new value. `row_idx` must be below [Column::len].
    ///
    /// # Errors
    /// Returns [Error::TypeMismatch] if the value's type does not match the column's data type.
    pub(crate) fn set(&mut self, row_idx: usize, value: &Value) -> Result<()> {
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col[row_idx] = *v,
            (ColumnData::Float(col), Value::Float(v)) => col[row_idx] = *v,
            (ColumnData::Text(col), Value::Text(v)) => col[row_idx] = Arc::clone(v),
            (ColumnData::Bool(col), Value::Bool(v)) => {
                col.set(row_idx, *v);
            }
            (_, value) => return Err(Error::type_mismatch(value.to_string(), self.data_type)),
        }
        Ok(())
    }

    /// Keeps only the rows whose bit is set in `keep`, preserving their relative order.
    ///
    /// `keep` must be exactly as long as the column.
    pub fn retain(&mut self, keep: &BitSlice) {
        debug_assert_eq!(keep.len(), self.len());
        match &mut self.data {
            ColumnData::Int(col) => retain_by_mask(col, keep),
            ColumnData::Float(col) => retain_by_mask(col, keep),
            ColumnData::Text(col) => retain_by_mask(col, keep),
            ColumnData::Bool(col) => {
                let kept: BitVec = col
                    .iter()
                    .by_vals()
                    .zip(keep.iter().by_vals())
                    .filter_map(|(bit, k)| k.then_some(bit))
                    .collect();
                *col = kept;
            }
        }
    }

    /// Removes every value from the column.
    pub fn clear(&mut self) {
        match &mut self.data {
            ColumnData::Int(col) => col.clear(),
            ColumnData::Float(col) => col.clear(),
            ColumnData::Text(col) => col.clear(),
            ColumnData::Bool(col) => col.clear(),
        }
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &BitSlice) {
    let mut idx = 0;
    values.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}
