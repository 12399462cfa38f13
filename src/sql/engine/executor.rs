//! Statement execution: bridges the parser and the table engine
//!
//! The engine dispatches one parsed statement to the database, compiles
//! WHERE clauses into row predicates, performs the cross-table equi-join
//! and formats results. Every failure is caught at statement granularity
//! and returned as a [`StatementResult::Failure`]; errors never cross the
//! statement boundary as raw faults.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::{
    error::{Error, Result},
    sql::{
        engine::{Database, TableInfo},
        parser::{
            Parser,
            ast::{ColumnSpec, Condition, JoinClause, Statement},
        },
        schema::{Column, Schema},
        types::{Row, Value},
    },
};

/// Executes SQL statements against a caller-owned database
pub struct ExecutionEngine<'a> {
    database: &'a mut Database,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(database: &'a mut Database) -> Self {
        Self { database }
    }

    /// Parses and executes one SQL statement
    ///
    /// Never returns an error: any failure becomes a
    /// [`StatementResult::Failure`]. Batched statements (multi-tuple
    /// INSERT, multi-row UPDATE/DELETE) apply rows one at a time, so rows
    /// applied before a mid-batch failure remain applied.
    pub fn execute(&mut self, sql: &str) -> StatementResult {
        match self.try_execute(sql) {
            Ok(result) => result,
            Err(err) => StatementResult::Failure {
                error: err.to_string(),
                statement: sql.trim().to_string(),
            },
        }
    }

    fn try_execute(&mut self, sql: &str) -> Result<StatementResult> {
        match Parser::new(sql).parse()? {
            Statement::CreateTable { name, columns } => self.execute_create_table(name, columns),
            Statement::Insert {
                table_name,
                columns,
                values,
            } => self.execute_insert(table_name, columns, values),
            Statement::Select {
                table_name,
                columns,
                join,
                where_clause,
            } => self.execute_select(table_name, columns, join, where_clause),
            Statement::Update {
                table_name,
                assignments,
                where_clause,
            } => self.execute_update(table_name, assignments, where_clause),
            Statement::Delete {
                table_name,
                where_clause,
            } => self.execute_delete(table_name, where_clause),
        }
    }

    fn execute_create_table(
        &mut self,
        name: String,
        specs: Vec<ColumnSpec>,
    ) -> Result<StatementResult> {
        let columns = specs
            .into_iter()
            .map(|spec| Column {
                name: spec.name,
                datatype: spec.datatype,
                primary_key: spec.primary_key,
                unique: spec.unique,
                nullable: spec.nullable.unwrap_or(true),
                max_length: spec.max_length,
            })
            .collect();
        let schema = Schema::new(name.clone(), columns)?;
        self.database.create_table(schema)?;
        Ok(StatementResult::CreateTable {
            message: format!("table '{}' created", name),
            table_info: self.database.table_info(&name)?,
        })
    }

    fn execute_insert(
        &mut self,
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Vec<Value>>,
    ) -> Result<StatementResult> {
        // Explicit column list, or the schema's column order
        let column_names = match columns {
            Some(columns) => columns,
            None => self.database.get_table(&table_name)?.schema().column_names(),
        };

        let mut inserted_rows = Vec::new();
        for tuple in values {
            if column_names.len() != tuple.len() {
                return Err(Error::Schema(format!(
                    "column count mismatch: {} columns, {} values",
                    column_names.len(),
                    tuple.len()
                )));
            }
            let row_data = Row::from_pairs(column_names.iter().cloned().zip(tuple));
            inserted_rows.push(self.database.insert(&table_name, row_data)?);
        }

        Ok(StatementResult::Insert {
            message: format!(
                "inserted {} row(s) into '{}'",
                inserted_rows.len(),
                table_name
            ),
            inserted_rows,
        })
    }

    fn execute_select(
        &mut self,
        table_name: String,
        columns: Option<Vec<String>>,
        join: Option<JoinClause>,
        where_clause: Option<Condition>,
    ) -> Result<StatementResult> {
        if let Some(join) = join {
            return self.execute_select_join(table_name, columns, join, where_clause);
        }

        let table = self.database.get_table(&table_name)?;
        let rows = match &where_clause {
            Some(condition) => table.select_where(|row| condition.matches(row))?,
            None => table.select_all(),
        };

        let rows = match &columns {
            Some(columns) => rows.iter().map(|row| row.project(columns)).collect(),
            None => rows,
        };

        Ok(StatementResult::Select {
            message: format!("selected {} row(s) from '{}'", rows.len(), table_name),
            rows,
        })
    }

    fn execute_select_join(
        &mut self,
        table_name: String,
        columns: Option<Vec<String>>,
        join: JoinClause,
        where_clause: Option<Condition>,
    ) -> Result<StatementResult> {
        let mut rows = self.database.join_inner(
            &table_name,
            &join.right_table,
            &join.left_column,
            &join.right_column,
        )?;

        // Joined rows carry qualified names, so the condition sees them too
        if let Some(condition) = &where_clause {
            let mut filtered = Vec::with_capacity(rows.len());
            for row in rows {
                if condition.matches(&row)? {
                    filtered.push(row);
                }
            }
            rows = filtered;
        }

        let rows = match &columns {
            Some(columns) => rows
                .iter()
                .map(|row| project_joined(row, columns, &table_name, &join.right_table))
                .collect(),
            None => rows,
        };

        Ok(StatementResult::Select {
            message: format!(
                "selected {} row(s) from '{}' joined with '{}'",
                rows.len(),
                table_name,
                join.right_table
            ),
            rows,
        })
    }

    fn execute_update(
        &mut self,
        table_name: String,
        assignments: Vec<(String, Value)>,
        where_clause: Option<Condition>,
    ) -> Result<StatementResult> {
        let updated_count = match &where_clause {
            Some(condition) => {
                self.database
                    .update_where(&table_name, |row| condition.matches(row), &assignments)?
            }
            None => self
                .database
                .update_where(&table_name, |_| Ok(true), &assignments)?,
        };
        Ok(StatementResult::Update {
            message: format!("updated {} row(s) in '{}'", updated_count, table_name),
            updated_count,
        })
    }

    fn execute_delete(
        &mut self,
        table_name: String,
        where_clause: Option<Condition>,
    ) -> Result<StatementResult> {
        let deleted_count = match &where_clause {
            Some(condition) => self
                .database
                .delete_where(&table_name, |row| condition.matches(row))?,
            None => self.database.delete_where(&table_name, |_| Ok(true))?,
        };
        Ok(StatementResult::Delete {
            message: format!("deleted {} row(s) from '{}'", deleted_count, table_name),
            deleted_count,
        })
    }
}

/// Projects one joined row onto the requested columns
///
/// Qualified names are looked up as-is and keep their qualified key.
/// Unqualified names resolve against the left table's columns first, then
/// the right's, and keep the unqualified key. Names matching neither side
/// are silently dropped.
fn project_joined(row: &Row, columns: &[String], left_table: &str, right_table: &str) -> Row {
    let mut data = Vec::with_capacity(columns.len());
    for name in columns {
        if name.contains('.') {
            if let Some(value) = row.get(name) {
                data.push((name.clone(), value.clone()));
            }
        } else {
            let left = format!("{}.{}", left_table, name);
            let right = format!("{}.{}", right_table, name);
            if let Some(value) = row.get(&left).or_else(|| row.get(&right)) {
                data.push((name.clone(), value.clone()));
            }
        }
    }
    Row::from_pairs(data)
}

/// Structured result of one executed statement
///
/// The variant carries the statement-kind-specific payload; `Failure` is
/// the uniform error shape. Serializes as a JSON object with a `success`
/// flag plus the variant's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    CreateTable {
        message: String,
        table_info: TableInfo,
    },
    Insert {
        message: String,
        inserted_rows: Vec<Row>,
    },
    Select {
        message: String,
        rows: Vec<Row>,
    },
    Update {
        message: String,
        updated_count: usize,
    },
    Delete {
        message: String,
        deleted_count: usize,
    },
    Failure {
        error: String,
        statement: String,
    },
}

impl StatementResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, StatementResult::Failure { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            StatementResult::CreateTable { message, .. }
            | StatementResult::Insert { message, .. }
            | StatementResult::Select { message, .. }
            | StatementResult::Update { message, .. }
            | StatementResult::Delete { message, .. } => Some(message),
            StatementResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StatementResult::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Result rows of a SELECT, empty for every other kind
    pub fn rows(&self) -> &[Row] {
        match self {
            StatementResult::Select { rows, .. } => rows,
            _ => &[],
        }
    }
}

impl Serialize for StatementResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("success", &self.is_success())?;
        match self {
            StatementResult::CreateTable {
                message,
                table_info,
            } => {
                map.serialize_entry("message", message)?;
                map.serialize_entry("table_info", table_info)?;
            }
            StatementResult::Insert {
                message,
                inserted_rows,
            } => {
                map.serialize_entry("message", message)?;
                map.serialize_entry("inserted_rows", inserted_rows)?;
            }
            StatementResult::Select { message, rows } => {
                map.serialize_entry("message", message)?;
                map.serialize_entry("rows", rows)?;
            }
            StatementResult::Update {
                message,
                updated_count,
            } => {
                map.serialize_entry("message", message)?;
                map.serialize_entry("updated_count", updated_count)?;
            }
            StatementResult::Delete {
                message,
                deleted_count,
            } => {
                map.serialize_entry("message", message)?;
                map.serialize_entry("deleted_count", deleted_count)?;
            }
            StatementResult::Failure { error, statement } => {
                map.serialize_entry("error", error)?;
                map.serialize_entry("statement", statement)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_users(engine: &mut ExecutionEngine) {
        let result =
            engine.execute("CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))");
        assert!(result.is_success(), "{:?}", result);
    }

    #[test]
    fn test_create_table_and_empty_lookup() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);

        match engine.execute("CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))") {
            StatementResult::Failure { error, .. } => assert!(error.contains("already exists")),
            other => panic!("expected failure, got {:?}", other),
        }

        assert_eq!(
            db.select_by_column("users", "id", &Value::Integer(1))?,
            vec![]
        );
        Ok(())
    }

    #[test]
    fn test_insert_and_select_where() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);

        match engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')") {
            StatementResult::Insert { inserted_rows, .. } => assert_eq!(inserted_rows.len(), 2),
            other => panic!("expected insert result, got {:?}", other),
        }

        let result = engine.execute("SELECT * FROM users WHERE id = 1");
        assert_eq!(
            result.rows(),
            &[Row::from_pairs(vec![
                ("id".to_string(), Value::Integer(1)),
                ("name".to_string(), Value::from("Alice")),
            ])]
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_primary_key_keeps_table_intact() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')");

        match engine.execute("INSERT INTO users (id, name) VALUES (1, 'Eve')") {
            StatementResult::Failure { error, .. } => assert!(error.contains("primary key")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(db.get_table("users")?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_insert_partial_batch_application() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);

        // The second tuple collides; the first stays applied
        let result =
            engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (1, 'Eve')");
        assert!(!result.is_success());
        assert_eq!(db.get_table("users")?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_insert_column_count_mismatch() {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);

        let result = engine.execute("INSERT INTO users (id, name) VALUES (1)");
        match result {
            StatementResult::Failure { error, .. } => {
                assert!(error.contains("column count mismatch"))
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // Without a column list the schema order applies
        let result = engine.execute("INSERT INTO users VALUES (1, 'Alice', true)");
        assert!(!result.is_success());
    }

    #[test]
    fn test_update_through_sql() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')");

        match engine.execute("UPDATE users SET name = 'Bob2' WHERE id = 2") {
            StatementResult::Update { updated_count, .. } => assert_eq!(updated_count, 1),
            other => panic!("expected update result, got {:?}", other),
        }

        let rows = db.select_by_column("users", "id", &Value::Integer(2))?;
        assert_eq!(rows[0].get("name"), Some(&Value::from("Bob2")));
        Ok(())
    }

    #[test]
    fn test_delete_through_sql() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')");

        match engine.execute("DELETE FROM users WHERE id = 1") {
            StatementResult::Delete { deleted_count, .. } => assert_eq!(deleted_count, 1),
            other => panic!("expected delete result, got {:?}", other),
        }

        assert_eq!(
            db.select_by_column("users", "id", &Value::Integer(1))?,
            vec![]
        );
        // The surviving row is still reachable through the index
        assert_eq!(
            db.select_by_column("users", "id", &Value::Integer(2))?.len(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_join_through_sql() {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute(
            "CREATE TABLE todos (id INT PRIMARY KEY, user_id INT, title VARCHAR(100))",
        );
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')");
        engine.execute("INSERT INTO todos (id, user_id, title) VALUES (10, 1, 'write tests')");

        let result =
            engine.execute("SELECT * FROM users INNER JOIN todos ON users.id = todos.user_id");
        let rows = result.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].columns().collect::<Vec<_>>(),
            vec!["users.id", "users.name", "todos.id", "todos.user_id", "todos.title"]
        );
        assert_eq!(rows[0].get("users.name"), Some(&Value::from("Alice")));

        // WHERE over the joined result uses qualified names
        let result = engine.execute(
            "SELECT * FROM users INNER JOIN todos ON users.id = todos.user_id \
             WHERE todos.title = 'write tests'",
        );
        assert_eq!(result.rows().len(), 1);

        // Projection accepts qualified and unqualified names
        let result = engine.execute(
            "SELECT users.name, title FROM users INNER JOIN todos ON users.id = todos.user_id",
        );
        let rows = result.rows();
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["users.name", "title"]);
        assert_eq!(rows[0].get("title"), Some(&Value::from("write tests")));
    }

    #[test]
    fn test_projection_without_join() {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')");

        let result = engine.execute("SELECT name FROM users");
        assert_eq!(result.rows()[0].columns().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_where_ordering_and_failures() {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Eve')");

        let result = engine.execute("SELECT * FROM users WHERE id > 1");
        assert_eq!(result.rows().len(), 2);
        let result = engine.execute("SELECT * FROM users WHERE id != 2");
        assert_eq!(result.rows().len(), 2);

        // Ordering against an incomparable literal fails at evaluation time
        let result = engine.execute("SELECT * FROM users WHERE id > 'one'");
        assert!(!result.is_success());

        // Unknown table is a structured failure, not a fault
        let result = engine.execute("SELECT * FROM nope");
        assert!(result.error().unwrap().contains("does not exist"));

        // Parse errors are structured failures too
        let result = engine.execute("SELEC * FROM users");
        assert!(!result.is_success());
    }

    #[test]
    fn test_update_without_where_hits_all_rows() {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);
        engine.execute("INSERT INTO users (id, name) VALUES (1, 'a'), (2, 'b')");

        match engine.execute("UPDATE users SET name = 'x'") {
            StatementResult::Update { updated_count, .. } => assert_eq!(updated_count, 2),
            other => panic!("expected update result, got {:?}", other),
        }
        match engine.execute("DELETE FROM users") {
            StatementResult::Delete { deleted_count, .. } => assert_eq!(deleted_count, 2),
            other => panic!("expected delete result, got {:?}", other),
        }
    }

    #[test]
    fn test_result_serialization() -> Result<()> {
        let mut db = Database::new("testdb");
        let mut engine = ExecutionEngine::new(&mut db);
        setup_users(&mut engine);

        let result = engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')");
        let json = serde_json::to_value(&result)?;
        assert_eq!(json["success"], true);
        assert_eq!(json["inserted_rows"][0]["name"], "Alice");

        let result = engine.execute("DELETE FROM nope");
        let json = serde_json::to_value(&result)?;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("does not exist"));
        Ok(())
    }
}
