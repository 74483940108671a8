//! JSON document form of databases and tables.
//!
//! A database is written as
//!
//! ```text
//! {"tables": {"<table>": {"columns": {"<col>": "<type>", ...},
//!                         "rows": [{"<col>": <value>, ...}, ...]}}}
//! ```
//!
//! Columns and row keys follow schema order. Values are native JSON numbers,
//! booleans and strings. Reading validates every row against its schema.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::data_type::DataType;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::table::{ColumnDef, Schema, Table};
use crate::value::Value;

struct ColumnsDoc<'a>(&'a Schema);

impl Serialize for ColumnsDoc<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for def in &self.0.columns {
            map.serialize_entry(&def.name, &def.data_type)?;
        }
        map.end()
    }
}

struct RowsDoc<'a>(&'a Table);

impl Serialize for RowsDoc<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let table = self.0;
        let mut seq = serializer.serialize_seq(Some(table.row_count))?;
        for row in table.rows() {
            seq.serialize_element(&RowDoc {
                schema: &table.schema,
                values: &row,
            })?;
        }
        seq.end()
    }
}

struct RowDoc<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl Serialize for RowDoc<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (def, value) in self.schema.columns.iter().zip(self.values) {
            map.serialize_entry(&def.name, value)?;
        }
        map.end()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("columns", &ColumnsDoc(&self.schema))?;
        map.serialize_entry("rows", &RowsDoc(self))?;
        map.end()
    }
}

struct TablesDoc<'a>(&'a Database);

impl Serialize for TablesDoc<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for table in self.0.tables() {
            map.serialize_entry(&table.name, table)?;
        }
        map.end()
    }
}

impl Serialize for Database {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("tables", &TablesDoc(self))?;
        map.end()
    }
}

fn encode<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

fn corrupt(message: impl Into<String>) -> Error {
    Error::CorruptDocument(message.into())
}

impl Database {
    /// Serializes the whole database to its JSON document.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        encode(self, pretty)
    }

    /// Rebuilds database `name` from its JSON document.
    ///
    /// # Example
    /// ```
    /// use flatdb::Database;
    ///
    /// let text = r#"{"tables": {"users": {"columns": {"id": "integer"}, "rows": [{"id": 7}]}}}"#;
    /// let db = Database::from_json("app", text).unwrap();
    /// assert_eq!(db.get_table("users").unwrap().row_count, 1);
    /// assert_eq!(db.to_json(false).unwrap(), text.replace(' ', ""));
    /// ```
    ///
    /// # Errors
    /// [Error::Serialization] for malformed JSON, [Error::CorruptDocument] when the
    /// document does not have the expected shape or a row contradicts its schema.
    pub fn from_json(name: &str, text: &str) -> Result<Database> {
        let doc: Json = serde_json::from_str(text)?;
        let tables = doc
            .get("tables")
            .and_then(Json::as_object)
            .ok_or_else(|| corrupt(format!("database {name:?} has no \"tables\" object")))?;

        let mut db = Database::new(name);
        for (table_name, table_doc) in tables {
            db.add_table(Table::from_document(table_name, table_doc)?)?;
        }
        Ok(db)
    }
}

impl Table {
    /// Serializes this table alone as `{"columns": ..., "rows": ...}`.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        encode(self, pretty)
    }

    /// Parses a single-table document, as written by [Table::to_json].
    pub fn from_json(name: &str, text: &str) -> Result<Table> {
        let doc: Json = serde_json::from_str(text)?;
        Table::from_document(name, &doc)
    }

    fn from_document(name: &str, doc: &Json) -> Result<Table> {
        let columns = doc
            .get("columns")
            .and_then(Json::as_object)
            .ok_or_else(|| corrupt(format!("table {name:?} has no \"columns\" object")))?;
        let defs = columns
            .iter()
            .map(|(column, ty)| {
                let data_type = ty
                    .as_str()
                    .and_then(|ty| ty.parse::<DataType>().ok())
                    .ok_or_else(|| {
                        corrupt(format!("table {name:?}: column {column:?} has invalid type {ty}"))
                    })?;
                if column.trim().is_empty() {
                    return Err(corrupt(format!("table {name:?} has an unnamed column")));
                }
                Ok(ColumnDef {
                    name: column.clone(),
                    data_type,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = Table::new(name.to_string(), Schema::new(defs)?);

        let rows = doc
            .get("rows")
            .and_then(Json::as_array)
            .ok_or_else(|| corrupt(format!("table {name:?} has no \"rows\" array")))?;
        for (i, row) in rows.iter().enumerate() {
            let row = row
                .as_object()
                .ok_or_else(|| corrupt(format!("table {name:?}: row {i} is not an object")))?;
            let values = decode_row(&table.schema, row)
                .map_err(|msg| corrupt(format!("table {name:?}: row {i}: {msg}")))?;
            table.insert(values)?;
        }
        Ok(table)
    }
}

/// Converts one row object into values in schema order. The key set must match
/// the schema exactly.
fn decode_row(schema: &Schema, row: &Map<String, Json>) -> std::result::Result<Vec<Value>, String> {
    if row.len() != schema.len() {
        return Err(format!("expected {} fields, found {}", schema.len(), row.len()));
    }
    schema
        .columns
        .iter()
        .map(|def| {
            let json = row
                .get(&def.name)
                .ok_or_else(|| format!("missing column {:?}", def.name))?;
            decode_value(json, def.data_type).ok_or_else(|| {
                format!("column {:?} expects {}, found {json}", def.name, def.data_type)
            })
        })
        .collect()
}

fn decode_value(json: &Json, data_type: DataType) -> Option<Value> {
    match data_type {
        DataType::Int => json.as_i64().map(Value::Int),
        DataType::Float => json.as_f64().map(Value::Float),
        DataType::Bool => json.as_bool().map(Value::Bool),
        DataType::Text => json.as_str().map(|s| Value::Text(s.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Select;

    fn sample() -> Database {
        let mut db = Database::new("shop");
        db.create_table("items", ["name:string", "price:float", "qty:integer", "sale:boolean"])
            .unwrap();
        db.insert("items", &["Pen", "1", "10", "true"]).unwrap();
        db.insert("items", &["Ink", "2.5", "3", "0"]).unwrap();
        db.create_table("empty", ["z:integer", "a:string"]).unwrap();
        db
    }

    #[test]
    fn test_document_shape() {
        let text = sample().to_json(false).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"tables":{"empty":{"columns":{"z":"integer","a":"string"},"rows":[]},"#,
                r#""items":{"columns":{"name":"string","price":"float","qty":"integer","sale":"boolean"},"#,
                r#""rows":[{"name":"Pen","price":1.0,"qty":10,"sale":true},"#,
                r#"{"name":"Ink","price":2.5,"qty":3,"sale":false}]}}}"#
            )
        );
    }

    #[test]
    fn test_round_trip_preserves_types_and_order() {
        let db = sample();
        let text = db.to_json(true).unwrap();
        let loaded = Database::from_json("shop", &text).unwrap();

        assert_eq!(loaded.list_tables(), vec!["empty", "items"]);
        assert_eq!(loaded.get_table("empty").unwrap().schema.names(), vec!["z", "a"]);
        assert_eq!(
            loaded.select("items", &Select::all()).unwrap(),
            db.select("items", &Select::all()).unwrap()
        );
        assert_eq!(loaded.to_json(true).unwrap(), text);
    }

    #[test]
    fn test_integer_json_accepted_for_float_column() {
        let text = r#"{"tables":{"t":{"columns":{"x":"float"},"rows":[{"x":3}]}}}"#;
        let db = Database::from_json("d", text).unwrap();
        let rows = db.select("t", &Select::all()).unwrap().rows;
        assert_eq!(rows, vec![vec![Value::Float(3.0)]]);
    }

    #[test]
    fn test_corrupt_documents() {
        let cases = [
            r#"{"nope":{}}"#,
            r#"{"tables":{"t":{"rows":[]}}}"#,
            r#"{"tables":{"t":{"columns":{"x":"decimal"},"rows":[]}}}"#,
            r#"{"tables":{"t":{"columns":{"x":"integer"}}}}"#,
            r#"{"tables":{"t":{"columns":{"x":"integer"},"rows":[{"x":1.5}]}}}"#,
            r#"{"tables":{"t":{"columns":{"x":"integer"},"rows":[{"y":1}]}}}"#,
            r#"{"tables":{"t":{"columns":{"x":"integer"},"rows":[{"x":1,"y":2}]}}}"#,
            r#"{"tables":{"t":{"columns":{"x":"boolean"},"rows":["true"]}}}"#,
        ];
        for text in cases {
            let err = Database::from_json("d", text).unwrap_err();
            assert!(matches!(err, Error::CorruptDocument(_)), "{text}: {err}");
            assert!(err.is_persistence());
        }
        assert!(matches!(
            Database::from_json("d", "{not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_table_document() {
        let db = sample();
        let table = db.get_table("items").unwrap();
        let text = table.to_json(false).unwrap();
        assert!(text.starts_with(r#"{"columns":{"name":"string""#));

        let copy = Table::from_json("copy", &text).unwrap();
        assert_eq!(copy.name, "copy");
        assert_eq!(copy.row_count, 2);
        assert_eq!(copy.schema, table.schema);
    }
}
