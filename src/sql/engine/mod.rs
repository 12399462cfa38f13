//! Execution layer: the table registry and the statement dispatcher
//!
//! A [`Database`] owns its tables; ownership is explicit and passed by the
//! caller, there is no process-wide instance. The engine in [`executor`]
//! borrows a database and runs parsed statements against it.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    error::{Error, Result},
    sql::{
        schema::{Column, Schema},
        table::Table,
        types::{Row, Value},
    },
};

pub mod executor;

/// A named collection of tables
pub struct Database {
    name: String,
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a new table for the given schema
    pub fn create_table(&mut self, schema: Schema) -> Result<()> {
        if self.tables.contains_key(&schema.name) {
            return Err(Error::Schema(format!(
                "table '{}' already exists",
                schema.name
            )));
        }
        self.tables.insert(schema.name.clone(), Table::new(schema));
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::Lookup(format!("table '{}' does not exist", name)))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::Lookup(format!("table '{}' does not exist", name)))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in sorted order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::Lookup(format!("table '{}' does not exist", name)))
    }

    /// Removes all rows from all tables, keeping the schemas
    pub fn clear_all_tables(&mut self) {
        for table in self.tables.values_mut() {
            table.clear();
        }
    }

    pub fn insert(&mut self, table: &str, row_data: Row) -> Result<Row> {
        self.get_table_mut(table)?.insert(row_data)
    }

    pub fn select_all(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.get_table(table)?.select_all())
    }

    pub fn select_where<P>(&self, table: &str, predicate: P) -> Result<Vec<Row>>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        self.get_table(table)?.select_where(predicate)
    }

    pub fn select_by_column(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>> {
        self.get_table(table)?.select_by_column(column, value)
    }

    pub fn update_where<P>(
        &mut self,
        table: &str,
        predicate: P,
        updates: &[(String, Value)],
    ) -> Result<usize>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        self.get_table_mut(table)?.update_where(predicate, updates)
    }

    pub fn delete_where<P>(&mut self, table: &str, predicate: P) -> Result<usize>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        self.get_table_mut(table)?.delete_where(predicate)
    }

    /// Inner equi-join of two tables on one column from each
    ///
    /// Builds a hash index over the right table's join column in a single
    /// pass, then emits one combined row per match. Combined rows qualify
    /// every column name as `table.column`. Left rows without a match emit
    /// nothing (inner semantics).
    pub fn join_inner(
        &self,
        left_table: &str,
        right_table: &str,
        left_column: &str,
        right_column: &str,
    ) -> Result<Vec<Row>> {
        let left = self.get_table(left_table)?;
        let right = self.get_table(right_table)?;
        if left.schema().column(left_column).is_none() {
            return Err(Error::Lookup(format!(
                "column '{}' does not exist in table '{}'",
                left_column, left_table
            )));
        }
        if right.schema().column(right_column).is_none() {
            return Err(Error::Lookup(format!(
                "column '{}' does not exist in table '{}'",
                right_column, right_table
            )));
        }

        let mut right_index: HashMap<Value, Vec<Row>> = HashMap::new();
        for row in right.select_all() {
            let key = row.get(right_column).cloned().unwrap_or(Value::Null);
            right_index.entry(key).or_default().push(row);
        }

        let mut joined = Vec::new();
        for left_row in left.select_all() {
            let key = left_row.get(left_column).cloned().unwrap_or(Value::Null);
            let Some(matches) = right_index.get(&key) else {
                continue;
            };
            for right_row in matches {
                let mut data = Vec::with_capacity(left_row.len() + right_row.len());
                for (name, value) in left_row.iter() {
                    data.push((format!("{}.{}", left_table, name), value.clone()));
                }
                for (name, value) in right_row.iter() {
                    data.push((format!("{}.{}", right_table, name), value.clone()));
                }
                joined.push(Row::from_pairs(data));
            }
        }
        Ok(joined)
    }

    /// Introspection data for one table
    pub fn table_info(&self, name: &str) -> Result<TableInfo> {
        let table = self.get_table(name)?;
        Ok(TableInfo {
            name: name.to_string(),
            row_count: table.count(),
            columns: table.schema().columns().to_vec(),
        })
    }

    /// Introspection data for the whole database
    pub fn database_info(&self) -> DatabaseInfo {
        DatabaseInfo {
            name: self.name.clone(),
            table_count: self.tables.len(),
            tables: self
                .tables
                .keys()
                .filter_map(|name| self.table_info(name).ok())
                .collect(),
        }
    }
}

/// Table metadata exposed for introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub row_count: usize,
    pub columns: Vec<Column>,
}

/// Database metadata exposed for introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub table_count: usize,
    pub tables: Vec<TableInfo>,
}
