use std::fmt::Display;

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Row, Value},
};

/// Parsed form of one SQL statement, ready for execution
#[derive(Debug, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable {
        name: String,
        columns: Vec<ColumnSpec>,
    },
    /// INSERT statement; `columns: None` means the schema's column order
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Vec<Value>>,
    },
    /// SELECT statement; `columns: None` means `*`
    Select {
        table_name: String,
        columns: Option<Vec<String>>,
        join: Option<JoinClause>,
        where_clause: Option<Condition>,
    },
    /// UPDATE statement
    Update {
        table_name: String,
        assignments: Vec<(String, Value)>,
        where_clause: Option<Condition>,
    },
    /// DELETE statement
    Delete {
        table_name: String,
        where_clause: Option<Condition>,
    },
}

/// Column definition inside a CREATE TABLE statement
///
/// `nullable: None` means the statement said neither NULL nor NOT NULL;
/// schema construction defaults it.
#[derive(Debug, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub datatype: DataType,
    pub max_length: Option<usize>,
    pub primary_key: bool,
    pub unique: bool,
    pub nullable: Option<bool>,
}

/// Single-table inner equi-join clause
///
/// The left side of the ON condition always references the FROM table, the
/// right side the joined table.
#[derive(Debug, PartialEq)]
pub struct JoinClause {
    pub right_table: String,
    pub left_column: String,
    pub right_column: String,
}

/// Comparison operators allowed in a WHERE clause
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::GreaterThan => ">",
            CompareOp::LessThan => "<",
        })
    }
}

/// A compiled WHERE condition: one comparison of a column against a
/// literal
///
/// Boolean composition (AND/OR) is deliberately unsupported; a WHERE
/// clause is exactly one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    /// Evaluates the condition against a row
    ///
    /// Equality and inequality use exact value equality (a missing column
    /// reads as NULL). Ordering comparisons use the value's natural
    /// ordering and fail when the operand types are not comparable,
    /// including any ordering against NULL.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        let actual = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            CompareOp::Equal => Ok(*actual == self.value),
            CompareOp::NotEqual => Ok(*actual != self.value),
            CompareOp::GreaterThan | CompareOp::LessThan => {
                if actual.is_null() || self.value.is_null() {
                    return Err(Error::Schema(format!(
                        "cannot order-compare NULL in condition {} {} {}",
                        self.column, self.op, self.value
                    )));
                }
                match actual.partial_cmp(&self.value) {
                    Some(ordering) => Ok(match self.op {
                        CompareOp::GreaterThan => ordering == std::cmp::Ordering::Greater,
                        _ => ordering == std::cmp::Ordering::Less,
                    }),
                    None => Err(Error::Schema(format!(
                        "incomparable types in condition {} {} {}",
                        self.column, self.op, self.value
                    ))),
                }
            }
        }
    }
}
