use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Row, Value},
};

/// Default length cap for VARCHAR columns declared without one
pub const DEFAULT_VARCHAR_LENGTH: usize = 255;

fn default_nullable() -> bool {
    true
}

/// Column schema definition
///
/// Serializes with the external snapshot/introspection key set:
/// `{name, type, primary_key, unique, nullable, max_length}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub datatype: DataType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// VARCHAR only; filled with [`DEFAULT_VARCHAR_LENGTH`] at schema build
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            primary_key: false,
            unique: false,
            nullable: true,
            max_length: None,
        }
    }

    /// Applies the construction invariants: VARCHAR gets a default length,
    /// a primary key is non-nullable and unique.
    fn normalize(&mut self) {
        if self.datatype == DataType::Varchar && self.max_length.is_none() {
            self.max_length = Some(DEFAULT_VARCHAR_LENGTH);
        }
        if self.primary_key {
            self.nullable = false;
            self.unique = true;
        }
    }

    fn check_length(&self, s: &str) -> Result<()> {
        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                return Err(Error::Schema(format!(
                    "string too long for column '{}': max {}",
                    self.name, max
                )));
            }
        }
        Ok(())
    }

    /// Validates that a value's runtime type matches the declared type
    pub fn check_type(&self, value: &Value) -> Result<()> {
        match (value, self.datatype) {
            (Value::Null, _) if self.nullable => Ok(()),
            (Value::Null, _) => Err(Error::Schema(format!(
                "column '{}' cannot be null",
                self.name
            ))),
            (Value::Integer(_), DataType::Integer) => Ok(()),
            (Value::Boolean(_), DataType::Boolean) => Ok(()),
            (Value::String(s), DataType::Varchar) => self.check_length(s),
            (value, _) => Err(Error::Schema(format!(
                "invalid value for column '{}': expected {}, got {}",
                self.name,
                self.datatype,
                value
                    .datatype()
                    .map_or("NULL".to_string(), |d| d.to_string())
            ))),
        }
    }

    /// Coerces a value to this column's declared type
    ///
    /// String inputs convert: integer parse for INT, the word sets
    /// true/1/yes/on and false/0/no/off (case-insensitive) for BOOLEAN,
    /// length-checked passthrough for VARCHAR. Matching non-string inputs
    /// pass through unchanged; everything else is a schema error.
    /// Coercion is idempotent: coercing an already-coerced value is a no-op.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match (value, self.datatype) {
            (Value::Null, _) if self.nullable => Ok(Value::Null),
            (Value::Null, _) => Err(Error::Schema(format!(
                "cannot coerce NULL into non-nullable column '{}'",
                self.name
            ))),
            (Value::String(s), DataType::Integer) => match s.parse::<i64>() {
                Ok(n) => Ok(Value::Integer(n)),
                Err(_) => Err(Error::Schema(format!(
                    "cannot convert '{}' to INT for column '{}'",
                    s, self.name
                ))),
            },
            (Value::String(s), DataType::Boolean) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Boolean(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Boolean(false)),
                _ => Err(Error::Schema(format!(
                    "cannot convert '{}' to BOOLEAN for column '{}'",
                    s, self.name
                ))),
            },
            (Value::String(s), DataType::Varchar) => {
                self.check_length(&s)?;
                Ok(Value::String(s))
            }
            (value @ Value::Integer(_), DataType::Integer) => Ok(value),
            (value @ Value::Boolean(_), DataType::Boolean) => Ok(value),
            (value, _) => Err(Error::Schema(format!(
                "cannot coerce {} into {} column '{}'",
                value
                    .datatype()
                    .map_or("NULL".to_string(), |d| d.to_string()),
                self.datatype,
                self.name
            ))),
        }
    }
}

/// Table schema: named, ordered column definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    columns: Vec<Column>,
}

impl Schema {
    /// Builds a schema, normalizing each column and enforcing the schema
    /// invariants: at least one column, unique column names, at most one
    /// primary key.
    pub fn new(name: impl Into<String>, mut columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(Error::Schema(format!("table '{}' has no columns", name)));
        }
        for column in columns.iter_mut() {
            column.normalize();
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::Schema(format!(
                    "duplicate column '{}' in table '{}'",
                    column.name, name
                )));
            }
        }
        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(Error::Schema(format!(
                "table '{}' can have at most one primary key",
                name
            )));
        }
        Ok(Self { name, columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in definition order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn primary_key_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }

    /// Validates a row against this schema: every non-nullable column must
    /// be present, no unknown columns, and every present value must match
    /// its column's declared type.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        for column in &self.columns {
            if !column.nullable && !row.contains(&column.name) {
                return Err(Error::Schema(format!(
                    "required column '{}' is missing",
                    column.name
                )));
            }
        }
        for (name, _) in row.iter() {
            if self.column(name).is_none() {
                return Err(Error::Schema(format!("unknown column '{}'", name)));
            }
        }
        for column in &self.columns {
            if let Some(value) = row.get(&column.name) {
                column.check_type(value)?;
            }
        }
        Ok(())
    }

    /// Validates and coerces one value against a named column
    pub fn coerce_value(&self, column: &str, value: Value) -> Result<Value> {
        let column = self
            .column(column)
            .ok_or_else(|| Error::Schema(format!("unknown column '{}'", column)))?;
        column.coerce(value)
    }
}
