//! Request shapes for the table operations: column selection, ordering and
//! update assignments.

use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnsSelect {
    /// Every column, in schema order.
    Star,
    ColumnsNames(Vec<String>),
}

impl ColumnsSelect {
    /// Parses `*` or a comma separated list of column names.
    ///
    /// Names are trimmed and repeated names are kept once, at their first position.
    /// An empty list selects every column.
    pub fn parse(text: &str) -> ColumnsSelect {
        let text = text.trim();
        if text.is_empty() || text == "*" {
            return ColumnsSelect::Star;
        }
        let mut names: Vec<String> = Vec::new();
        for name in text.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return ColumnsSelect::Star;
        }
        ColumnsSelect::ColumnsNames(names)
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnsSelect {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut names: Vec<String> = Vec::new();
        for name in iter.into_iter().map(Into::into) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if names.is_empty() {
            return ColumnsSelect::Star;
        }
        ColumnsSelect::ColumnsNames(names)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(Error::InvalidSortOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: SortDirection,
}

/// A `SELECT` request against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub condition: Option<String>,
    pub order_by: Option<OrderByClause>,
}

impl Default for Select {
    fn default() -> Self {
        Self {
            columns: ColumnsSelect::Star,
            condition: None,
            order_by: None,
        }
    }
}

impl Select {
    /// Selects every column of every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: ColumnsSelect) -> Self {
        self.columns = columns;
        self
    }

    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderByClause {
            column: column.into(),
            direction,
        });
        self
    }
}

/// One `column=value` pair of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub column: String,
    pub raw_value: String,
}

impl FromStr for Assignment {
    type Err = Error;

    /// Splits on the first `=`; both sides are trimmed.
    fn from_str(token: &str) -> Result<Self> {
        let (column, raw_value) = token
            .split_once('=')
            .ok_or_else(|| Error::InvalidAssignmentSyntax(token.to_string()))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(Error::InvalidAssignmentSyntax(token.to_string()));
        }
        Ok(Assignment {
            column: column.to_string(),
            raw_value: raw_value.trim().to_string(),
        })
    }
}
