//! SQL processing module
//!
//! This module provides:
//! - `types`: runtime values and the row representation
//! - `schema`: table and column schema definitions, validation, coercion
//! - `table`: row storage with constraint indexes
//! - `parser`: SQL lexer and parser
//! - `engine`: database registry and statement execution

pub mod engine;
pub mod parser;
pub mod schema;
pub mod table;
pub mod types;
