//! Table storage: an ordered row store plus constraint indexes
//!
//! Every column declared `PRIMARY KEY` or `UNIQUE` gets a constraint index,
//! a map from value to the set of row positions holding that value. The
//! index both rejects duplicates and serves point lookups. NULL values are
//! never indexed. Outside of a single running operation the indexes always
//! agree with the row store; a failed insert or update leaves them
//! untouched.

use std::collections::{BTreeSet, HashMap};

use crate::{
    error::{Error, Result},
    sql::{
        schema::Schema,
        types::{Row, Value},
    },
};

type ConstraintIndex = HashMap<Value, BTreeSet<usize>>;

/// A single table: schema, row storage and constraint indexes
#[derive(Debug)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
    indexes: HashMap<String, ConstraintIndex>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        let indexes = schema
            .columns()
            .iter()
            .filter(|c| c.primary_key || c.unique)
            .map(|c| (c.name.clone(), ConstraintIndex::new()))
            .collect();
        Self {
            schema,
            rows: Vec::new(),
            indexes,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes all rows, keeping the schema and empty constraint indexes
    pub fn clear(&mut self) {
        self.rows.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    /// Inserts a row, returning the stored (validated and coerced) copy
    ///
    /// Validation, coercion and constraint checks all complete before any
    /// mutation, so a failing insert leaves rows and indexes untouched.
    pub fn insert(&mut self, row_data: Row) -> Result<Row> {
        self.schema.validate_row(&row_data)?;

        let mut coerced = Vec::with_capacity(row_data.len());
        for (name, value) in row_data.iter() {
            coerced.push((name.to_string(), self.schema.coerce_value(name, value.clone())?));
        }
        let row = Row::from_pairs(coerced);

        self.check_constraints(&row, None)?;

        let position = self.rows.len();
        self.rows.push(row.clone());
        self.index_row(&row, position);
        Ok(row)
    }

    /// Returns a snapshot copy of all rows in storage order
    pub fn select_all(&self) -> Vec<Row> {
        self.rows.clone()
    }

    /// Linear scan in storage order; predicate failures abort the scan
    pub fn select_where<P>(&self, predicate: P) -> Result<Vec<Row>>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        let mut matched = Vec::new();
        for row in &self.rows {
            if predicate(row)? {
                matched.push(row.clone());
            }
        }
        Ok(matched)
    }

    /// Point lookup: uses the constraint index when the column has one,
    /// otherwise falls back to a linear scan
    pub fn select_by_column(&self, column: &str, value: &Value) -> Result<Vec<Row>> {
        if self.schema.column(column).is_none() {
            return Err(Error::Lookup(format!("unknown column '{}'", column)));
        }

        if let Some(index) = self.indexes.get(column) {
            if let Some(positions) = index.get(value) {
                return Ok(positions.iter().map(|&p| self.rows[p].clone()).collect());
            }
        }

        Ok(self
            .rows
            .iter()
            .filter(|row| row.get(column).unwrap_or(&Value::Null) == value)
            .cloned()
            .collect())
    }

    /// Updates every row matching the predicate, returning how many were
    /// updated
    ///
    /// Two phases: collect matching positions, then rewrite each row in
    /// place. The first failing row aborts the statement with its error;
    /// rows already rewritten stay rewritten (no cross-row rollback).
    pub fn update_where<P>(&mut self, predicate: P, updates: &[(String, Value)]) -> Result<usize>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        let mut matched = Vec::new();
        for (position, row) in self.rows.iter().enumerate() {
            if predicate(row)? {
                matched.push(position);
            }
        }

        let mut updated = 0;
        for position in matched {
            let old_row = self.rows[position].clone();
            let merged = old_row.with_columns(updates.iter().cloned());
            self.schema.validate_row(&merged)?;

            let mut coerced = Vec::with_capacity(merged.len());
            for (name, value) in merged.iter() {
                coerced.push((name.to_string(), self.schema.coerce_value(name, value.clone())?));
            }
            let new_row = Row::from_pairs(coerced);

            // The row's own position is excluded so that an update leaving
            // a constrained value unchanged always passes.
            self.check_constraints(&new_row, Some(position))?;

            self.unindex_row(&old_row, position);
            self.rows[position] = new_row.clone();
            self.index_row(&new_row, position);
            updated += 1;
        }
        Ok(updated)
    }

    /// Deletes every row matching the predicate, returning how many were
    /// deleted
    ///
    /// Matches are removed in descending position order so earlier
    /// positions are unaffected, and every row at or after a removed
    /// position is re-indexed. That re-indexing is O(n) per delete, the
    /// price of the array-backed row store.
    pub fn delete_where<P>(&mut self, predicate: P) -> Result<usize>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        let mut matched = Vec::new();
        for (position, row) in self.rows.iter().enumerate() {
            if predicate(row)? {
                matched.push(position);
            }
        }

        for &position in matched.iter().rev() {
            let row = self.rows[position].clone();
            self.unindex_row(&row, position);
            self.rows.remove(position);
            self.reindex_from(position);
        }
        Ok(matched.len())
    }

    /// Checks every constraint index against the row's (coerced) values,
    /// failing on the first collision. `exclude` is the row's own position
    /// during an update.
    fn check_constraints(&self, row: &Row, exclude: Option<usize>) -> Result<()> {
        for column in self.schema.columns() {
            let Some(index) = self.indexes.get(&column.name) else {
                continue;
            };
            let Some(value) = row.get(&column.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if let Some(positions) = index.get(value) {
                let taken = match exclude {
                    Some(own) => positions.iter().any(|&p| p != own),
                    None => !positions.is_empty(),
                };
                if taken {
                    let kind = if column.primary_key {
                        "primary key"
                    } else {
                        "unique constraint"
                    };
                    return Err(Error::Constraint(format!(
                        "{} violation: {}={} already exists",
                        kind, column.name, value
                    )));
                }
            }
        }
        Ok(())
    }

    fn index_row(&mut self, row: &Row, position: usize) {
        for (column, index) in self.indexes.iter_mut() {
            if let Some(value) = row.get(column) {
                if !value.is_null() {
                    index.entry(value.clone()).or_default().insert(position);
                }
            }
        }
    }

    fn unindex_row(&mut self, row: &Row, position: usize) {
        for (column, index) in self.indexes.iter_mut() {
            if let Some(value) = row.get(column) {
                if let Some(positions) = index.get_mut(value) {
                    positions.remove(&position);
                    if positions.is_empty() {
                        index.remove(value);
                    }
                }
            }
        }
    }

    /// After removing the row at `start`, every later row shifted down by
    /// one; move each of their index entries from the old position to the
    /// new one.
    fn reindex_from(&mut self, start: usize) {
        for position in start..self.rows.len() {
            let row = &self.rows[position];
            for (column, index) in self.indexes.iter_mut() {
                if let Some(value) = row.get(column) {
                    if let Some(positions) = index.get_mut(value) {
                        positions.remove(&(position + 1));
                        positions.insert(position);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::schema::Column;
    use crate::sql::types::DataType;

    fn users_table() -> Table {
        let schema = Schema::new(
            "users",
            vec![
                Column {
                    primary_key: true,
                    ..Column::new("id", DataType::Integer)
                },
                Column {
                    max_length: Some(50),
                    ..Column::new("name", DataType::Varchar)
                },
                Column {
                    unique: true,
                    ..Column::new("email", DataType::Varchar)
                },
            ],
        )
        .unwrap();
        Table::new(schema)
    }

    fn user(id: i64, name: &str, email: &str) -> Row {
        Row::from_pairs(vec![
            ("id".to_string(), Value::Integer(id)),
            ("name".to_string(), Value::from(name)),
            ("email".to_string(), Value::from(email)),
        ])
    }

    #[test]
    fn test_insert_and_select() -> Result<()> {
        let mut table = users_table();
        assert!(table.is_empty());
        assert_eq!(table.select_by_column("id", &Value::Integer(1))?, vec![]);

        table.insert(user(1, "Alice", "alice@example.com"))?;
        table.insert(user(2, "Bob", "bob@example.com"))?;
        assert_eq!(table.count(), 2);

        let rows = table.select_by_column("id", &Value::Integer(1))?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Alice")));

        // Indexed lookup must agree with the linear scan
        let scanned = table.select_where(|row| Ok(row.get("id") == Some(&Value::Integer(1))))?;
        assert_eq!(rows, scanned);
        Ok(())
    }

    #[test]
    fn test_select_by_unknown_column() {
        let table = users_table();
        assert!(matches!(
            table.select_by_column("missing", &Value::Integer(1)),
            Err(Error::Lookup(_))
        ));
    }

    #[test]
    fn test_insert_coerces_values() -> Result<()> {
        let mut table = users_table();
        // Stored values come back coerced even when inserted pre-coerced
        let stored = table.insert(user(7, "Eve", "eve@example.com"))?;
        assert_eq!(stored.get("id"), Some(&Value::Integer(7)));
        Ok(())
    }

    #[test]
    fn test_duplicate_primary_key_rejected() -> Result<()> {
        let mut table = users_table();
        table.insert(user(1, "Alice", "alice@example.com"))?;

        let err = table.insert(user(1, "Eve", "eve@example.com")).unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert!(err.to_string().contains("primary key"));
        assert_eq!(table.count(), 1);

        // A failed insert must not leave index entries behind
        assert_eq!(
            table
                .select_by_column("email", &Value::from("eve@example.com"))?
                .len(),
            0
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_unique_rejected() -> Result<()> {
        let mut table = users_table();
        table.insert(user(1, "Alice", "alice@example.com"))?;
        let err = table
            .insert(user(2, "Alice2", "alice@example.com"))
            .unwrap_err();
        assert!(err.to_string().contains("unique constraint"));
        assert_eq!(table.count(), 1);
        Ok(())
    }

    #[test]
    fn test_null_not_indexed() -> Result<()> {
        let schema = Schema::new(
            "t",
            vec![
                Column {
                    primary_key: true,
                    ..Column::new("id", DataType::Integer)
                },
                Column {
                    unique: true,
                    ..Column::new("code", DataType::Varchar)
                },
            ],
        )
        .unwrap();
        let mut table = Table::new(schema);

        // Two NULLs in a unique column do not collide
        for id in 1..=2 {
            table.insert(Row::from_pairs(vec![
                ("id".to_string(), Value::Integer(id)),
                ("code".to_string(), Value::Null),
            ]))?;
        }
        assert_eq!(table.count(), 2);
        Ok(())
    }

    #[test]
    fn test_update_where() -> Result<()> {
        let mut table = users_table();
        table.insert(user(1, "Alice", "alice@example.com"))?;
        table.insert(user(2, "Bob", "bob@example.com"))?;

        let updated = table.update_where(
            |row| Ok(row.get("id") == Some(&Value::Integer(2))),
            &[("name".to_string(), Value::from("Bob2"))],
        )?;
        assert_eq!(updated, 1);

        let rows = table.select_by_column("id", &Value::Integer(2))?;
        assert_eq!(rows[0].get("name"), Some(&Value::from("Bob2")));
        Ok(())
    }

    #[test]
    fn test_update_keeps_own_constrained_value() -> Result<()> {
        let mut table = users_table();
        table.insert(user(1, "Alice", "alice@example.com"))?;

        // Re-asserting the row's own primary key value is not a collision
        let updated = table.update_where(
            |row| Ok(row.get("id") == Some(&Value::Integer(1))),
            &[
                ("id".to_string(), Value::Integer(1)),
                ("name".to_string(), Value::from("Alicia")),
            ],
        )?;
        assert_eq!(updated, 1);
        Ok(())
    }

    #[test]
    fn test_update_constraint_collision() -> Result<()> {
        let mut table = users_table();
        table.insert(user(1, "Alice", "alice@example.com"))?;
        table.insert(user(2, "Bob", "bob@example.com"))?;

        let err = table
            .update_where(
                |row| Ok(row.get("id") == Some(&Value::Integer(2))),
                &[("id".to_string(), Value::Integer(1))],
            )
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));

        // The failed update must leave both rows reachable by index
        assert_eq!(table.select_by_column("id", &Value::Integer(1))?.len(), 1);
        assert_eq!(table.select_by_column("id", &Value::Integer(2))?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_update_moves_index_entry() -> Result<()> {
        let mut table = users_table();
        table.insert(user(1, "Alice", "alice@example.com"))?;

        table.update_where(
            |row| Ok(row.get("id") == Some(&Value::Integer(1))),
            &[("id".to_string(), Value::Integer(9))],
        )?;
        assert_eq!(table.select_by_column("id", &Value::Integer(1))?.len(), 0);
        assert_eq!(table.select_by_column("id", &Value::Integer(9))?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_delete_reindexes_following_rows() -> Result<()> {
        let mut table = users_table();
        for id in 1..=4 {
            table.insert(user(id, &format!("u{}", id), &format!("u{}@x.com", id)))?;
        }

        let deleted = table.delete_where(|row| Ok(row.get("id") == Some(&Value::Integer(2))))?;
        assert_eq!(deleted, 1);
        assert_eq!(table.count(), 3);

        // Every surviving row must still be reachable through its index
        for id in [1, 3, 4] {
            let rows = table.select_by_column("id", &Value::Integer(id))?;
            assert_eq!(rows.len(), 1, "id {} lost after re-indexing", id);
            assert_eq!(rows[0].get("id"), Some(&Value::Integer(id)));
        }
        assert_eq!(table.select_by_column("id", &Value::Integer(2))?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_delete_multiple() -> Result<()> {
        let mut table = users_table();
        for id in 1..=5 {
            table.insert(user(id, &format!("u{}", id), &format!("u{}@x.com", id)))?;
        }

        let deleted = table.delete_where(|row| {
            Ok(matches!(row.get("id"), Some(Value::Integer(n)) if n % 2 == 1))
        })?;
        assert_eq!(deleted, 3);
        assert_eq!(table.count(), 2);
        for id in [2, 4] {
            assert_eq!(table.select_by_column("id", &Value::Integer(id))?.len(), 1);
        }
        Ok(())
    }

    #[test]
    fn test_count_tracks_inserts_and_deletes() -> Result<()> {
        let mut table = users_table();
        for id in 1..=6 {
            table.insert(user(id, &format!("u{}", id), &format!("u{}@x.com", id)))?;
        }
        table.delete_where(|row| Ok(row.get("id") == Some(&Value::Integer(3))))?;
        table.delete_where(|row| Ok(row.get("id") == Some(&Value::Integer(6))))?;
        assert_eq!(table.count(), 4);
        Ok(())
    }
}
