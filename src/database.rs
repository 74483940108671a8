use std::cmp::Ordering;
use std::collections::BTreeMap;

use bitvec::prelude::*;
use tracing::debug;

use crate::condition::{BoundCondition, Condition};
use crate::error::{Error, Result};
use crate::query::{Assignment, ColumnsSelect, OrderByClause, Select, SortDirection};
use crate::table::{Schema, Table};
use crate::value::Value;

/// One named database: a collection of tables and the operations on them.
///
/// Every operation validates all of its inputs before touching a table, so an
/// error never leaves a half-applied change behind.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    /// A map of table names to their respective [Table] structures.
    tables: BTreeMap<String, Table>,
}

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// The matching rows, each projected onto `columns`.
    pub rows: Vec<Vec<Value>>,
    /// How many rows the table held before filtering.
    pub source_rows: usize,
}

impl QueryResult {
    /// True when the queried table had no rows at all.
    pub fn is_table_empty(&self) -> bool {
        self.source_rows == 0
    }

    /// True when no row is returned, whether the table was empty or everything was filtered out.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up the value of `column` in the `row_idx`-th result row.
    pub fn value(&self, row_idx: usize, column: &str) -> Option<&Value> {
        let col_idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row_idx).and_then(|row| row.get(col_idx))
    }
}

impl Database {
    /// Creates a new, empty database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a new table from `name:type` column definitions.
    ///
    /// # Errors
    /// [Error::TableAlreadyExists] if the name is taken, or any schema error
    /// from [Schema::from_definitions].
    pub fn create_table<I, S>(&mut self, name: &str, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.tables.contains_key(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }
        let schema = Schema::from_definitions(definitions)?;
        self.add_table(Table::new(name.to_string(), schema))
    }

    /// Installs an already built table.
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::TableAlreadyExists(table.name));
        }
        debug!(database = %self.name, table = %table.name, columns = table.schema.len(), "created table");
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Removes a table from the database by its name.
    ///
    /// # Errors
    /// Returns [Error::TableNotFound] if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        match self.tables.remove(name) {
            Some(_) => {
                debug!(database = %self.name, table = name, "dropped table");
                Ok(())
            }
            None => Err(Error::TableNotFound(name.to_string())),
        }
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Retrieves a mutable reference to a table by name.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Iterates over the tables, sorted by name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.get_table(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Inserts one row given as raw text, one token per column in schema order.
    ///
    /// Every token is coerced before the row is appended; any failure
    /// leaves the table untouched.
    ///
    /// # Errors
    /// [Error::TableNotFound], [Error::ColumnCountMismatch] or [Error::TypeMismatch].
    pub fn insert<S: AsRef<str>>(&mut self, table: &str, raw_values: &[S]) -> Result<()> {
        let table = self.table_mut(table)?;
        if raw_values.len() != table.schema.len() {
            return Err(Error::ColumnCountMismatch {
                table: table.name.clone(),
                expected: table.schema.len(),
                found: raw_values.len(),
            });
        }
        let row = table
            .schema
            .columns
            .iter()
            .zip(raw_values)
            .map(|(def, raw)| Value::coerce(raw.as_ref(), def.data_type))
            .collect::<Result<Vec<_>>>()?;

        table.insert(row)?;
        debug!(table = %table.name, rows = table.row_count, "inserted row");
        Ok(())
    }

    /// Executes a `SELECT` and returns the resulting data set.
    ///
    /// 1. **Resolves** the projected columns.
    /// 2. **Filters** rows with the condition, keeping their order.
    /// 3. **Sorts** the remaining rows by the `ORDER BY` column (stable).
    /// 4. **Projects** only the requested columns.
    ///
    /// # Example
    ///
    /// ```
    /// use flatdb::{Database, Select, SortDirection, ColumnsSelect, Value};
    ///
    /// let mut db = Database::new("shop");
    /// db.create_table("products", ["name:string", "price:integer"]).unwrap();
    /// db.insert("products", &["Laptop", "1200"]).unwrap();
    /// db.insert("products", &["Mouse", "25"]).unwrap();
    ///
    /// let select = Select::all()
    ///     .columns(ColumnsSelect::parse("name"))
    ///     .filter("price < 100")
    ///     .order_by("price", SortDirection::Asc);
    /// let result = db.select("products", &select).unwrap();
    ///
    /// assert_eq!(result.columns, vec!["name"]);
    /// assert_eq!(result.rows, vec![vec![Value::Text("Mouse".into())]]);
    /// ```
    ///
    /// # Errors
    /// [Error::TableNotFound], [Error::UnknownColumn] for a projected, filtered or
    /// ordering column that does not exist, plus condition parsing errors.
    pub fn select(&self, table: &str, select: &Select) -> Result<QueryResult> {
        let table = self.table(table)?;

        let projection: Vec<usize> = match &select.columns {
            ColumnsSelect::ColumnsNames(names) if !names.is_empty() => names
                .iter()
                .map(|name| table.schema.resolve(name))
                .collect::<Result<_>>()?,
            _ => (0..table.schema.len()).collect(),
        };
        let bound = self.bind_condition(table, select.condition.as_deref())?;
        let sort_key = select
            .order_by
            .as_ref()
            .map(|clause| self.resolve_order_by(table, clause))
            .transpose()?;

        let matching = self.matching_rows(table, bound.as_ref());
        let mut rows: Vec<Vec<Value>> = matching
            .iter_ones()
            .filter_map(|i| table.get_row(i))
            .collect();

        if let Some((idx, direction)) = sort_key {
            self.sort(&mut rows, idx, direction);
        }

        let rows = rows
            .into_iter()
            .map(|full_row| projection.iter().map(|&i| full_row[i].clone()).collect())
            .collect();

        Ok(QueryResult {
            columns: projection
                .iter()
                .map(|&i| table.schema.columns[i].name.clone())
                .collect(),
            rows,
            source_rows: table.row_count,
        })
    }

    /// Executes an update: applies every `column=value` assignment to every row
    /// matching `condition` (all rows when `None`). Returns how many rows changed.
    ///
    /// The update is performed in two phases:
    /// 1. **Validation**: assignments are parsed and coerced, the condition is bound.
    /// 2. **Modification**: the identified rows are rewritten column by column.
    ///
    /// # Errors
    /// [Error::TableNotFound], [Error::InvalidAssignmentSyntax], [Error::UnknownColumn],
    /// [Error::TypeMismatch], plus condition parsing errors. Nothing is modified on error.
    pub fn update<S: AsRef<str>>(
        &mut self,
        table: &str,
        assignments: &[S],
        condition: Option<&str>,
    ) -> Result<usize> {
        if assignments.is_empty() {
            return Err(Error::InvalidAssignmentSyntax(String::new()));
        }
        let (values, rows) = {
            let table = self.table(table)?;
            let values = assignments
                .iter()
                .map(|token| {
                    let assignment: Assignment = token.as_ref().parse()?;
                    let idx = table.schema.resolve(&assignment.column)?;
                    let value =
                        Value::coerce(&assignment.raw_value, table.schema.columns[idx].data_type)?;
                    Ok((idx, value))
                })
                .collect::<Result<Vec<_>>>()?;
            let bound = self.bind_condition(table, condition)?;
            (values, self.matching_rows(table, bound.as_ref()))
        };

        let table = self.table_mut(table)?;
        for (idx, value) in &values {
            let column = &mut table.columns[*idx];
            for row in rows.iter_ones() {
                column.set(row, value)?;
            }
        }
        let updated = rows.count_ones();
        debug!(table = %table.name, rows = updated, "updated rows");
        Ok(updated)
    }

    /// Deletes the rows matching `condition`, or every row when `None`.
    /// Returns how many rows were removed; the remaining rows keep their order.
    ///
    /// # Errors
    /// [Error::TableNotFound], [Error::UnknownColumn], [Error::TypeMismatch], plus
    /// condition parsing errors.
    pub fn delete(&mut self, table: &str, condition: Option<&str>) -> Result<usize> {
        let doomed = {
            let table = self.table(table)?;
            match self.bind_condition(table, condition)? {
                Some(bound) => Some(self.matching_rows(table, Some(&bound))),
                None => None,
            }
        };

        let table = self.table_mut(table)?;
        let removed = match doomed {
            Some(doomed) => table.delete_rows(&doomed),
            None => table.clear(),
        };
        debug!(table = %table.name, rows = removed, "deleted rows");
        Ok(removed)
    }

    fn bind_condition(&self, table: &Table, condition: Option<&str>) -> Result<Option<BoundCondition>> {
        condition
            .map(|text| Condition::parse(text)?.bind(&table.schema))
            .transpose()
    }

    fn resolve_order_by(&self, table: &Table, clause: &OrderByClause) -> Result<(usize, SortDirection)> {
        Ok((table.schema.resolve(&clause.column)?, clause.direction))
    }

    /// Marks the rows satisfying `condition`; every row when there is none.
    fn matching_rows(&self, table: &Table, condition: Option<&BoundCondition>) -> BitVec {
        let Some(condition) = condition else {
            return bitvec![1; table.row_count];
        };
        let column = &table.columns[condition.index];
        (0..table.row_count)
            .map(|i| column.get(i).is_some_and(|v| condition.matches(&v)))
            .collect()
    }

    /// Sorts rows in place by the value at `idx`, using the column type's ordering.
    ///
    /// The sort is stable in both directions: `Desc` reverses the comparison,
    /// not the result, so equal keys keep their original order.
    fn sort(&self, rows: &mut [Vec<Value>], idx: usize, direction: SortDirection) {
        rows.sort_by(|a, b| {
            let ord = a[idx].compare(&b[idx]).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Database {
        let mut db = Database::new("test");
        db.create_table("people", ["name:string", "age:integer"])
            .unwrap();
        db.insert("people", &["A", "20"]).unwrap();
        db.insert("people", &["B", "25"]).unwrap();
        db.insert("people", &["C", "30"]).unwrap();
        db
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut db = Database::new("test");

        assert!(db.create_table("users", ["id:integer"]).is_ok());
        assert!(db.get_table("users").is_some());

        assert!(db.drop_table("users").is_ok());
        assert!(db.get_table("users").is_none());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = Database::new("test");

        db.create_table("users", ["id:integer"]).unwrap();
        let err = db.create_table("users", ["id:integer"]).unwrap_err();

        assert!(matches!(err, Error::TableAlreadyExists(t) if t == "users"));
    }

    #[test]
    fn test_create_table_propagates_schema_errors() {
        let mut db = Database::new("test");
        assert!(matches!(
            db.create_table("t", ["id integer"]),
            Err(Error::InvalidColumnSyntax(_))
        ));
        assert!(matches!(
            db.create_table("t", ["id:text"]),
            Err(Error::UnsupportedType(_))
        ));
        assert!(db.list_tables().is_empty());
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut db = Database::new("test");

        let err = db.drop_table("unknown");
        assert!(matches!(err, Err(Error::TableNotFound(_))));
    }

    #[test]
    fn test_list_tables() {
        let mut db = Database::new("test");

        db.create_table("users", ["id:integer"]).unwrap();
        db.create_table("posts", ["id:integer"]).unwrap();

        assert_eq!(db.list_tables(), vec!["posts", "users"]);
    }

    #[test]
    fn test_select_empty_table_keeps_schema_order() {
        let mut db = Database::new("test");
        db.create_table("t", ["a:integer", "b:string"]).unwrap();

        let result = db.select("t", &Select::all()).unwrap();

        assert_eq!(result.columns, vec!["a", "b"]);
        assert!(result.rows.is_empty());
        assert!(result.is_table_empty());
    }

    #[test]
    fn test_insert_coerces_values() {
        let mut db = Database::new("test");
        db.create_table("users", ["id:integer", "name:string"])
            .unwrap();
        db.insert("users", &["1", "Alice"]).unwrap();

        let result = db.select("users", &Select::all()).unwrap();

        assert_eq!(
            result.rows,
            vec![vec![Value::Int(1), Value::Text("Alice".into())]]
        );
        assert_eq!(result.value(0, "id").and_then(Value::as_int), Some(1));
    }

    #[test]
    fn test_insert_errors_commit_nothing() {
        let mut db = Database::new("test");
        db.create_table("users", ["id:integer", "name:string", "score:float"])
            .unwrap();

        assert!(matches!(
            db.insert("users", &["1", "Alice"]),
            Err(Error::ColumnCountMismatch { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            db.insert("users", &["1", "Alice", "high"]),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            db.insert("ghosts", &["1"]),
            Err(Error::TableNotFound(_))
        ));
        assert_eq!(db.get_table("users").unwrap().row_count, 0);
    }

    #[test]
    fn test_select_filter_sort_project() {
        let db = people();
        let select = Select::all()
            .columns(ColumnsSelect::parse("name"))
            .filter("age>=21")
            .order_by("age", SortDirection::Desc);

        let result = db.select("people", &select).unwrap();

        assert_eq!(result.columns, vec!["name"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Text("C".into())], vec![Value::Text("B".into())]]
        );
    }

    #[test]
    fn test_select_where_no_match_is_not_empty_table() {
        let db = people();

        let result = db.select("people", &Select::all().filter("age > 100")).unwrap();

        assert!(result.is_empty());
        assert!(!result.is_table_empty());
        assert_eq!(result.source_rows, 3);
    }

    #[test]
    fn test_select_blank_column_list_selects_everything() {
        let db = people();

        for columns in [ColumnsSelect::parse(" , "), ColumnsSelect::ColumnsNames(vec![])] {
            let result = db.select("people", &Select::all().columns(columns)).unwrap();
            assert_eq!(result.columns, vec!["name", "age"]);
            assert_eq!(result.rows[0], vec![Value::Text("A".into()), Value::Int(20)]);
        }
    }

    #[test]
    fn test_select_unknown_columns() {
        let db = people();

        for select in [
            Select::all().columns(ColumnsSelect::parse("name, height")),
            Select::all().filter("height > 1"),
            Select::all().order_by("height", SortDirection::Asc),
        ] {
            assert!(matches!(
                db.select("people", &select),
                Err(Error::UnknownColumn(c)) if c == "height"
            ));
        }
    }

    #[test]
    fn test_order_by_uses_numeric_ordering() {
        let mut db = Database::new("test");
        db.create_table("n", ["v:integer"]).unwrap();
        for v in ["10", "9", "100"] {
            db.insert("n", &[v]).unwrap();
        }

        let result = db
            .select("n", &Select::all().order_by("v", SortDirection::Asc))
            .unwrap();

        let values: Vec<i64> = result.rows.iter().filter_map(|r| r[0].as_int()).collect();
        assert_eq!(values, vec![9, 10, 100]);
    }

    #[test]
    fn test_order_by_is_stable_both_ways() {
        let mut db = Database::new("test");
        db.create_table("t", ["id:integer", "grp:boolean"]).unwrap();
        for row in [["1", "true"], ["2", "false"], ["3", "true"], ["4", "false"]] {
            db.insert("t", &row).unwrap();
        }

        let ids = |dir| {
            db.select("t", &Select::all().order_by("grp", dir))
                .unwrap()
                .rows
                .iter()
                .filter_map(|r| r[0].as_int())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(SortDirection::Asc), vec![2, 4, 1, 3]);
        assert_eq!(ids(SortDirection::Desc), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_order_by_hidden_column() {
        let db = people();

        let result = db
            .select(
                "people",
                &Select::all()
                    .columns(ColumnsSelect::parse("name"))
                    .order_by("age", SortDirection::Desc),
            )
            .unwrap();

        assert_eq!(result.rows[0][0], Value::Text("C".into()));
        assert_eq!(result.rows[2][0], Value::Text("A".into()));
    }

    #[test]
    fn test_update_with_condition() {
        let mut db = Database::new("test");
        db.create_table("t", ["id:integer", "age:integer"]).unwrap();
        db.insert("t", &["1", "20"]).unwrap();
        db.insert("t", &["2", "25"]).unwrap();

        let count = db.update("t", &["age=30"], Some("id=1")).unwrap();

        assert_eq!(count, 1);
        let rows = db.select("t", &Select::all()).unwrap().rows;
        assert_eq!(rows[0], vec![Value::Int(1), Value::Int(30)]);
        assert_eq!(rows[1], vec![Value::Int(2), Value::Int(25)]);
    }

    #[test]
    fn test_update_all_rows_multiple_assignments() {
        let mut db = people();

        let count = db.update("people", &["name = Z", "age=1"], None).unwrap();

        assert_eq!(count, 3);
        let result = db.select("people", &Select::all()).unwrap();
        assert!(result
            .rows
            .iter()
            .all(|r| r == &vec![Value::Text("Z".into()), Value::Int(1)]));
    }

    #[test]
    fn test_update_requires_an_assignment() {
        let mut db = people();

        let err = db.update("people", &[] as &[&str], None).unwrap_err();
        assert!(matches!(err, Error::InvalidAssignmentSyntax(_)));

        let result = db.select("people", &Select::all()).unwrap();
        assert_eq!(result.rows[0], vec![Value::Text("A".into()), Value::Int(20)]);
    }

    #[test]
    fn test_update_validates_everything_first() {
        let mut db = people();

        assert!(matches!(
            db.update("people", &["name=Z", "age=old"], None),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            db.update("people", &["name=Z", "height=2"], None),
            Err(Error::UnknownColumn(_))
        ));
        assert!(matches!(
            db.update("people", &["name Z"], None),
            Err(Error::InvalidAssignmentSyntax(_))
        ));
        assert!(matches!(
            db.update("people", &["name=Z"], Some("height>1")),
            Err(Error::UnknownColumn(_))
        ));
        assert!(matches!(
            db.update("people", &["name=Z"], Some("age 1")),
            Err(Error::InvalidConditionSyntax(_))
        ));

        let names: Vec<String> = db
            .select("people", &Select::all().columns(ColumnsSelect::parse("name")))
            .unwrap()
            .rows
            .iter()
            .map(|r| r[0].to_string())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_delete_specific_rows_keeps_order() {
        let mut db = people();

        let removed = db.delete("people", Some("age != 25")).unwrap();

        assert_eq!(removed, 2);
        let result = db.select("people", &Select::all()).unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Text("B".into()), Value::Int(25)]]
        );
    }

    #[test]
    fn test_delete_all_then_again() {
        let mut db = people();

        assert_eq!(db.delete("people", None).unwrap(), 3);
        assert_eq!(db.delete("people", None).unwrap(), 0);
        assert!(db.select("people", &Select::all()).unwrap().is_table_empty());
    }

    #[test]
    fn test_delete_errors() {
        let mut db = people();
        assert!(matches!(
            db.delete("nobody", None),
            Err(Error::TableNotFound(_))
        ));
        assert!(matches!(
            db.delete("people", Some("height=1")),
            Err(Error::UnknownColumn(_))
        ));
        assert_eq!(db.get_table("people").unwrap().row_count, 3);
    }
}
