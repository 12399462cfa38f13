//! Immutable row representation
//!
//! A `Row` is an ordered mapping of column name to [`Value`]. Rows are never
//! mutated in place: every deriving operation (`with_value`, `project`, ...)
//! produces a new `Row`, so a row handed out by a table read can never be
//! used to reach back into the table's storage.

use std::fmt::Display;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Value;

/// A single record: column names and values in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    data: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Builds a row from (column, value) pairs; a repeated column keeps the
    /// last value, like repeated keys in a map literal.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.upsert(column, value);
        }
        row
    }

    fn upsert(&mut self, column: String, value: Value) {
        match self.data.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.data.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.data.iter().any(|(name, _)| name == column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.data.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a new row with one column set (added or replaced)
    pub fn with_value(&self, column: impl Into<String>, value: Value) -> Row {
        let mut row = self.clone();
        row.upsert(column.into(), value);
        row
    }

    /// Returns a new row without the given column
    pub fn without_column(&self, column: &str) -> Row {
        Row {
            data: self
                .data
                .iter()
                .filter(|(name, _)| name != column)
                .cloned()
                .collect(),
        }
    }

    /// Returns a new row with every given column set (added or replaced)
    pub fn with_columns(&self, columns: impl IntoIterator<Item = (String, Value)>) -> Row {
        let mut row = self.clone();
        for (column, value) in columns {
            row.upsert(column, value);
        }
        row
    }

    /// Returns a new row keeping only the listed columns, in the listed
    /// order; names not present in the row are silently dropped.
    pub fn project(&self, columns: &[String]) -> Row {
        Row {
            data: columns
                .iter()
                .filter_map(|column| {
                    self.get(column)
                        .map(|value| (column.clone(), value.clone()))
                })
                .collect(),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row(")?;
        for (i, (name, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

/// Rows serialize as JSON objects in column order
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.data.len()))?;
        for (column, value) in &self.data {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of column names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut data = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((column, value)) = access.next_entry::<String, Value>()? {
                    data.push((column, value));
                }
                Ok(Row::from_pairs(data))
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}
