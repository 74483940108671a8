//! Single-comparison conditions: `column <op> literal`.
//!
//! A condition is parsed from text once, then bound against a [Schema] which
//! resolves the column and coerces the literal to the column's type. The bound
//! form is what gets evaluated row after row.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::table::Schema;
use crate::value::Value;

/// Comparison operators supported in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    /// Two-character operators come first so that `<=` is never read as `<`.
    const BY_LENGTH: [(&'static str, ComparisonOp); 6] = [
        ("!=", ComparisonOp::NotEq),
        ("<=", ComparisonOp::LtEq),
        (">=", ComparisonOp::GtEq),
        ("=", ComparisonOp::Eq),
        ("<", ComparisonOp::Lt),
        (">", ComparisonOp::Gt),
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
        }
    }

    /// Returns true if `ordering` (row value compared to literal) satisfies the operator.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::NotEq => ordering != Ordering::Equal,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::LtEq => ordering != Ordering::Greater,
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::GtEq => ordering != Ordering::Less,
        }
    }

    /// Finds the leftmost operator in `text`, returning its byte offset.
    fn find(text: &str) -> Option<(usize, ComparisonOp)> {
        text.char_indices().find_map(|(pos, _)| {
            let rest = &text[pos..];
            Self::BY_LENGTH
                .iter()
                .find(|(symbol, _)| rest.starts_with(*symbol))
                .map(|(_, op)| (pos, *op))
        })
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbol().fmt(f)
    }
}

/// A parsed, not yet validated, condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: ComparisonOp,
    pub literal: String,
}

impl Condition {
    /// Parses `column <op> literal`.
    ///
    /// The text is split once, at the leftmost operator; both sides are trimmed.
    ///
    /// # Example
    /// ```
    /// use flatdb::condition::{ComparisonOp, Condition};
    ///
    /// let cond = Condition::parse("age <= 30").unwrap();
    /// assert_eq!(cond.column, "age");
    /// assert_eq!(cond.op, ComparisonOp::LtEq);
    /// assert_eq!(cond.literal, "30");
    /// ```
    ///
    /// # Errors
    /// [Error::InvalidConditionSyntax] when no operator is present or the column
    /// name is empty.
    pub fn parse(text: &str) -> Result<Condition> {
        let (pos, op) = ComparisonOp::find(text)
            .ok_or_else(|| Error::InvalidConditionSyntax(text.to_string()))?;
        let column = text[..pos].trim();
        if column.is_empty() {
            return Err(Error::InvalidConditionSyntax(text.to_string()));
        }
        let literal = text[pos + op.symbol().len()..].trim();

        Ok(Condition {
            column: column.to_string(),
            op,
            literal: literal.to_string(),
        })
    }

    /// Resolves the column against `schema` and coerces the literal to its type.
    ///
    /// # Errors
    /// [Error::UnknownColumn] if the column is not in the schema,
    /// [Error::TypeMismatch] if the literal does not coerce.
    pub fn bind(&self, schema: &Schema) -> Result<BoundCondition> {
        let index = schema.resolve(&self.column)?;
        let data_type = schema.columns[index].data_type;
        let value = Value::coerce(&self.literal, data_type)?;
        Ok(BoundCondition {
            index,
            op: self.op,
            value,
        })
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Condition::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.op, self.literal)
    }
}

/// A condition whose column position and literal value are known.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCondition {
    /// Index of the column in schema order.
    pub index: usize,
    pub op: ComparisonOp,
    /// The literal, already coerced to the column's type.
    pub value: Value,
}

impl BoundCondition {
    /// Applies the comparison to the value found in the bound column.
    pub fn matches(&self, row_value: &Value) -> bool {
        compare_values(row_value, self.op, &self.value)
    }
}

/// Evaluates `row[column] <op> literal`, coercing `literal` to `data_type` first.
///
/// `row` holds one value per schema column, in schema order; callers have
/// already checked that `column` exists (it is `column_index` here).
pub fn evaluate(
    row: &[Value],
    column_index: usize,
    op: ComparisonOp,
    literal: &str,
    data_type: DataType,
) -> Result<bool> {
    let value = Value::coerce(literal, data_type)?;
    Ok(compare_values(&row[column_index], op, &value))
}

fn compare_values(left: &Value, op: ComparisonOp, right: &Value) -> bool {
    left.compare(right).is_some_and(|ordering| op.holds(ordering))
}
