//! Database snapshots through a key-value store
//!
//! A snapshot is two JSON documents: `table_schemas` maps each table name
//! to its column definitions, `table_data` maps each table name to its
//! rows. Loading replays `create_table` and `insert` per table, so the
//! restored tables rebuild their constraint indexes; a table whose
//! restoration fails is logged and skipped without failing the rest.

use serde_json::{Map, Value as Json, json};

use crate::{
    error::{Error, Result},
    sql::{
        engine::Database,
        schema::{Column, Schema},
        types::Row,
    },
    storage::engine::Store,
};

pub const TABLE_SCHEMAS_KEY: &str = "table_schemas";
pub const TABLE_DATA_KEY: &str = "table_data";

/// Serializes every table's schema and rows into the store
pub fn save_database(database: &Database, store: &mut impl Store) -> Result<()> {
    let mut schemas = Map::new();
    let mut data = Map::new();
    for name in database.list_tables() {
        let table = database.get_table(&name)?;
        schemas.insert(name.clone(), json!({ "columns": table.schema().columns() }));
        data.insert(name.clone(), serde_json::to_value(table.select_all())?);
    }
    store.set(TABLE_SCHEMAS_KEY, Json::Object(schemas))?;
    store.set(TABLE_DATA_KEY, Json::Object(data))
}

/// Rebuilds a database from a snapshot in the store
///
/// An absent or malformed snapshot yields an empty database. A single
/// table failing to restore does not fail the load.
pub fn load_database(store: &impl Store, name: impl Into<String>) -> Database {
    let mut database = Database::new(name);

    let schemas = store
        .get(TABLE_SCHEMAS_KEY)
        .unwrap_or_else(|| Json::Object(Map::new()));
    let data = store
        .get(TABLE_DATA_KEY)
        .unwrap_or_else(|| Json::Object(Map::new()));
    let Some(schemas) = schemas.as_object() else {
        tracing::warn!("snapshot schemas are not an object, loading empty database");
        return database;
    };

    for (table_name, schema_json) in schemas {
        if let Err(err) = restore_table(&mut database, table_name, schema_json, data.get(table_name))
        {
            tracing::warn!(table = %table_name, error = %err, "skipping table restoration");
        }
    }
    database
}

fn restore_table(
    database: &mut Database,
    table_name: &str,
    schema_json: &Json,
    rows: Option<&Json>,
) -> Result<()> {
    let columns_json = schema_json.get("columns").ok_or_else(|| {
        Error::Storage(format!("snapshot of table '{}' has no columns", table_name))
    })?;
    let columns: Vec<Column> = serde_json::from_value(columns_json.clone())?;
    database.create_table(Schema::new(table_name, columns)?)?;

    if let Some(rows) = rows.and_then(Json::as_array) {
        for row_json in rows {
            let row: Row = serde_json::from_value(row_json.clone())?;
            database.insert(table_name, row)?;
        }
    }
    Ok(())
}
