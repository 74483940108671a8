//! Line-oriented command shell on top of [DatabaseStore].
//!
//! Each input line is one command. Keywords are case-insensitive; names,
//! values and conditions are passed through as written.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::database::QueryResult;
use crate::error::Error;
use crate::query::{ColumnsSelect, Select, SortDirection};
use crate::storage::Storage;
use crate::store::DatabaseStore;

pub const HELP: &str = "\
Available commands:
  CREATE DATABASE <name>                     Create a new database
  DELETE DATABASE <name>                     Delete a database
  LIST DATABASES                             List all databases
  USE DATABASE <name>                        Select the database to work with
  EXIT DATABASE                              Leave the selected database
  CREATE TABLE <name> <col:type>, ...        Create a table (types: integer, string, float, boolean)
  DROP TABLE <name>                          Delete a table
  LIST TABLES                                List the tables of the selected database
  INSERT INTO <name> VALUES <v1>, <v2>, ...  Insert one row
  UPDATE <name> SET <col=value>, ... [WHERE <cond>]
  DELETE FROM <name> [WHERE <cond>]
  SELECT <cols|*> FROM <name> [WHERE <cond>] [ORDER BY <col> [ASC|DESC]]
  EXPORT TABLE <name> TO <file>              Write a table as JSON
  EXPORT DATABASE TO <file>                  Write the selected database as JSON
  IMPORT TABLE <name> FROM <file>            Load a table exported with EXPORT TABLE
  HELP                                       Show this message
  EXIT                                       Leave the shell
Conditions compare one column with a literal: =, !=, <, <=, >, >=";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateDatabase(String),
    DeleteDatabase(String),
    ListDatabases,
    UseDatabase(String),
    ExitDatabase,
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    DropTable(String),
    ListTables,
    Insert {
        table: String,
        values: Vec<String>,
    },
    Update {
        table: String,
        assignments: Vec<String>,
        condition: Option<String>,
    },
    Delete {
        table: String,
        condition: Option<String>,
    },
    Select {
        table: String,
        select: Select,
    },
    ExportTable {
        table: String,
        path: PathBuf,
    },
    ExportDatabase(PathBuf),
    ImportTable {
        table: String,
        path: PathBuf,
    },
    Help,
    Exit,
}

impl Command {
    /// Parses one input line.
    pub fn parse(line: &str) -> Result<Command> {
        let line = line.trim();

        if let Some(rest) = strip_keyword(line, "CREATE DATABASE") {
            return Ok(Command::CreateDatabase(single_name(rest, "CREATE DATABASE <name>")?));
        }
        if let Some(rest) = strip_keyword(line, "DELETE DATABASE") {
            return Ok(Command::DeleteDatabase(single_name(rest, "DELETE DATABASE <name>")?));
        }
        if let Some(rest) = strip_keyword(line, "USE DATABASE") {
            return Ok(Command::UseDatabase(single_name(rest, "USE DATABASE <name>")?));
        }
        if let Some(rest) = strip_keyword(line, "CREATE TABLE") {
            return parse_create_table(rest);
        }
        if let Some(rest) = strip_keyword(line, "DROP TABLE") {
            return Ok(Command::DropTable(single_name(rest, "DROP TABLE <name>")?));
        }
        if let Some(rest) = strip_keyword(line, "INSERT INTO") {
            return parse_insert(rest);
        }
        if let Some(rest) = strip_keyword(line, "DELETE FROM") {
            return parse_delete(rest);
        }
        if let Some(rest) = strip_keyword(line, "EXPORT TABLE") {
            let (table, path) = split_keyword(rest, "TO")
                .context("Invalid syntax. Usage: EXPORT TABLE <name> TO <file>")?;
            return Ok(Command::ExportTable {
                table: single_name(table, "EXPORT TABLE <name> TO <file>")?,
                path: file_path(path, "EXPORT TABLE <name> TO <file>")?,
            });
        }
        if let Some(rest) = strip_keyword(line, "EXPORT DATABASE TO") {
            return Ok(Command::ExportDatabase(file_path(rest, "EXPORT DATABASE TO <file>")?));
        }
        if let Some(rest) = strip_keyword(line, "IMPORT TABLE") {
            let (table, path) = split_keyword(rest, "FROM")
                .context("Invalid syntax. Usage: IMPORT TABLE <name> FROM <file>")?;
            return Ok(Command::ImportTable {
                table: single_name(table, "IMPORT TABLE <name> FROM <file>")?,
                path: file_path(path, "IMPORT TABLE <name> FROM <file>")?,
            });
        }
        if let Some(rest) = strip_keyword(line, "UPDATE") {
            return parse_update(rest);
        }
        if let Some(rest) = strip_keyword(line, "SELECT") {
            return parse_select(rest);
        }

        let command = match line.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>()[..] {
            ["list", "databases"] => Command::ListDatabases,
            ["exit", "database"] => Command::ExitDatabase,
            ["list", "tables"] => Command::ListTables,
            ["help"] => Command::Help,
            ["exit"] | ["quit"] => Command::Exit,
            _ => bail!("Unknown command. Type 'help' for available commands."),
        };
        Ok(command)
    }
}

fn parse_create_table(rest: &str) -> Result<Command> {
    const USAGE: &str = "Invalid syntax. Usage: CREATE TABLE <name> <col:type>, ...";
    let (table, definitions) = rest.split_once(char::is_whitespace).context(USAGE)?;
    let columns = split_list(definitions);
    if columns.is_empty() {
        bail!(USAGE);
    }
    Ok(Command::CreateTable {
        table: table.to_string(),
        columns,
    })
}

fn parse_insert(rest: &str) -> Result<Command> {
    let (table, values) = split_keyword(rest, "VALUES")
        .context("Invalid syntax. Usage: INSERT INTO <name> VALUES <v1>, <v2>, ...")?;
    Ok(Command::Insert {
        table: single_name(table, "INSERT INTO <name> VALUES <v1>, <v2>, ...")?,
        values: split_list(values),
    })
}

fn parse_delete(rest: &str) -> Result<Command> {
    let (table, condition) = match split_keyword(rest, "WHERE") {
        Some((table, condition)) => (table, Some(condition.to_string())),
        None => (rest, None),
    };
    Ok(Command::Delete {
        table: single_name(table, "DELETE FROM <name> [WHERE <cond>]")?,
        condition,
    })
}

fn parse_update(rest: &str) -> Result<Command> {
    const USAGE: &str = "UPDATE <name> SET <col=value>, ... [WHERE <cond>]";
    let (table, tail) =
        split_keyword(rest, "SET").with_context(|| format!("Invalid syntax. Usage: {USAGE}"))?;
    let (assignments, condition) = match split_keyword(tail, "WHERE") {
        Some((assignments, condition)) => (assignments, Some(condition.to_string())),
        None => (tail, None),
    };
    let assignments = split_list(assignments);
    if assignments.is_empty() {
        bail!("Invalid syntax. Usage: {USAGE}");
    }
    Ok(Command::Update {
        table: single_name(table, USAGE)?,
        assignments,
        condition,
    })
}

fn parse_select(rest: &str) -> Result<Command> {
    const USAGE: &str = "SELECT <cols|*> FROM <name> [WHERE <cond>] [ORDER BY <col> [ASC|DESC]]";
    let (columns, tail) =
        split_keyword(rest, "FROM").with_context(|| format!("Invalid syntax. Usage: {USAGE}"))?;
    let mut select = Select::all().columns(ColumnsSelect::parse(columns));

    let tail = match rsplit_keyword(tail, "ORDER BY") {
        Some((before, order)) => {
            let mut words = order.split_whitespace();
            let (Some(column), direction, None) = (words.next(), words.next(), words.next()) else {
                bail!("Invalid syntax. Usage: {USAGE}");
            };
            let direction: SortDirection = direction.unwrap_or("asc").parse()?;
            select = select.order_by(column, direction);
            before
        }
        None => tail,
    };
    let table = match split_keyword(tail, "WHERE") {
        Some((table, condition)) => {
            select = select.filter(condition);
            table
        }
        None => tail,
    };

    Ok(Command::Select {
        table: single_name(table, USAGE)?,
        select,
    })
}

/// Strips a leading, whitespace separated keyword sequence, ignoring case.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let mut rest = text;
    for word in keyword.split_whitespace() {
        rest = rest.trim_start();
        let head = rest.get(..word.len())?;
        if !head.eq_ignore_ascii_case(word) {
            return None;
        }
        rest = &rest[word.len()..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
    }
    Some(rest.trim())
}

/// Byte offsets of every standalone occurrence of `keyword` in `text`, ignoring case.
fn keyword_positions(text: &str, keyword: &str) -> Vec<usize> {
    let lowered = text.to_ascii_lowercase();
    let keyword = keyword.to_ascii_lowercase();
    lowered
        .match_indices(keyword.as_str())
        .map(|(pos, _)| pos)
        .filter(|&pos| {
            let before = lowered[..pos].chars().next_back();
            let after = lowered[pos + keyword.len()..].chars().next();
            before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace)
        })
        .collect()
}

/// Splits `text` around the first standalone `keyword`.
fn split_keyword<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let pos = *keyword_positions(text, keyword).first()?;
    Some((text[..pos].trim(), text[pos + keyword.len()..].trim()))
}

/// Splits `text` around the last standalone `keyword`.
fn rsplit_keyword<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let pos = *keyword_positions(text, keyword).last()?;
    Some((text[..pos].trim(), text[pos + keyword.len()..].trim()))
}

fn split_list(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',').map(|item| item.trim().to_string()).collect()
}

fn single_name(text: &str, usage: &str) -> Result<String> {
    let mut words = text.split_whitespace();
    match (words.next(), words.next()) {
        (Some(name), None) => Ok(name.to_string()),
        _ => bail!("Invalid syntax. Usage: {usage}"),
    }
}

fn file_path(text: &str, usage: &str) -> Result<PathBuf> {
    if text.is_empty() {
        bail!("Invalid syntax. Usage: {usage}");
    }
    Ok(PathBuf::from(text))
}

/// What the caller should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Print this text and keep reading commands.
    Text(String),
    Exit,
}

/// Interactive session state: the store and the selected database.
pub struct Shell<S: Storage> {
    store: DatabaseStore<S>,
    current: Option<String>,
}

impl<S: Storage> Shell<S> {
    pub fn new(store: DatabaseStore<S>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn current_database(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn prompt(&self) -> String {
        format!(
            "flatdb ({})> ",
            self.current.as_deref().unwrap_or("no database selected")
        )
    }

    /// Parses and runs one line.
    pub fn execute(&mut self, line: &str) -> Result<Output> {
        if line.trim().is_empty() {
            return Ok(Output::Text(String::new()));
        }
        self.run(Command::parse(line)?)
    }

    pub fn run(&mut self, command: Command) -> Result<Output> {
        let text = match command {
            Command::Exit => return Ok(Output::Exit),
            Command::Help => HELP.to_string(),
            Command::CreateDatabase(name) => {
                self.store.create_database(&name)?;
                format!("Database '{name}' created successfully.")
            }
            Command::DeleteDatabase(name) => {
                self.store.delete_database(&name)?;
                if self.current.as_deref() == Some(name.as_str()) {
                    self.current = None;
                }
                format!("Database '{name}' deleted successfully.")
            }
            Command::ListDatabases => list("Available databases:", self.store.list_databases()?),
            Command::UseDatabase(name) => self.use_database(&name)?,
            Command::ExitDatabase => match self.current.take() {
                Some(name) => format!("Exited from database '{name}'."),
                None => bail!("No database is currently selected."),
            },
            Command::CreateTable { table, columns } => {
                self.store.create_table(self.database()?, &table, &columns)?;
                format!("Table '{table}' created successfully.")
            }
            Command::DropTable(table) => {
                self.store.drop_table(self.database()?, &table)?;
                format!("Table '{table}' dropped successfully.")
            }
            Command::ListTables => {
                list("Tables in database:", self.store.list_tables(self.database()?)?)
            }
            Command::Insert { table, values } => {
                self.store.insert(self.database()?, &table, &values)?;
                format!("Data inserted into table '{table}' successfully.")
            }
            Command::Update {
                table,
                assignments,
                condition,
            } => {
                let count =
                    self.store
                        .update(self.database()?, &table, &assignments, condition.as_deref())?;
                format!("{count} row(s) updated in table '{table}'.")
            }
            Command::Delete { table, condition } => {
                let count = self
                    .store
                    .delete(self.database()?, &table, condition.as_deref())?;
                format!("{count} row(s) deleted from table '{table}'.")
            }
            Command::Select { table, select } => {
                let result = self.store.select(self.database()?, &table, &select)?;
                render(&table, &result)
            }
            Command::ExportTable { table, path } => {
                self.store.export_table(self.database()?, &table, &path)?;
                format!("Table '{table}' exported to {}.", path.display())
            }
            Command::ExportDatabase(path) => {
                let db = self.database()?;
                self.store.export_database(db, &path)?;
                format!("Database '{db}' exported to {}.", path.display())
            }
            Command::ImportTable { table, path } => {
                let rows = self.store.import_table(self.database()?, &table, &path)?;
                format!("Table '{table}' imported from {} ({rows} row(s)).", path.display())
            }
        };
        Ok(Output::Text(text))
    }

    /// Selects `name` as the database table commands run against.
    pub fn use_database(&mut self, name: &str) -> Result<String> {
        if !self.store.database_exists(name)? {
            return Err(Error::DatabaseNotFound(name.to_string()).into());
        }
        self.current = Some(name.to_string());
        Ok(format!("Now using database '{name}'."))
    }

    fn database(&self) -> Result<&str> {
        self.current
            .as_deref()
            .context("No database selected. Use 'USE DATABASE <name>' first.")
    }
}

fn list(title: &str, names: Vec<String>) -> String {
    if names.is_empty() {
        return format!("{title}\n  (none)");
    }
    let mut out = title.to_string();
    for name in names {
        let _ = write!(out, "\n  {name}");
    }
    out
}

/// Renders a result as a ` | ` separated grid.
pub fn render(table: &str, result: &QueryResult) -> String {
    if result.is_table_empty() {
        return format!("No data found in table '{table}'.");
    }
    let header = result
        .columns
        .iter()
        .map(|c| format!("{c:15}"))
        .collect::<Vec<_>>()
        .join(" | ");
    let mut out = format!("{header}\n{}", "-".repeat(header.len()));
    for row in &result.rows {
        let line = row
            .iter()
            .map(|v| format!("{:15}", v.to_string()))
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = write!(out, "\n{line}");
    }
    let _ = write!(out, "\n({} row(s))", result.rows.len());
    out
}
