//! reldb - A minimal in-memory relational database engine in Rust
//!
//! This crate provides:
//! - Typed table schemas with primary-key/unique/nullable constraints
//! - In-memory tables with constraint-enforcing value indexes
//! - A small SQL subset (CREATE TABLE, INSERT, SELECT with WHERE and
//!   INNER JOIN, UPDATE, DELETE)
//! - An execution engine returning structured per-statement results
//! - JSON key-value snapshot persistence
//!
//! WHERE clauses are a single comparison (`=`, `!=`, `>`, `<`); boolean
//! composition with AND/OR is deliberately unsupported.
//!
//! ```
//! use reldb::sql::engine::{Database, executor::ExecutionEngine};
//!
//! let mut db = Database::new("demo");
//! let mut engine = ExecutionEngine::new(&mut db);
//! engine.execute("CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))");
//! engine.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')");
//! let result = engine.execute("SELECT * FROM users WHERE id = 1");
//! assert_eq!(result.rows().len(), 1);
//! ```

pub mod error;
pub mod sql;
pub mod storage;
