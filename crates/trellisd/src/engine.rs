//! SQLite-backed transaction engine for record hooks.
//!
//! The engine owns a single connection behind a mutex and hands hooks a
//! scoped transaction: the closure's `Ok` commits, any `Err` rolls the
//! whole transaction back before the error propagates. Values cross the
//! boundary as JSON; the mapping to SQLite types is defined here and
//! rejects shapes SQLite cannot hold.

use std::sync::Mutex;

use camino::Utf8Path;
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use trellis_plugins::{PluginError, PluginTransaction, TransactionSource, TransactionWork};

/// Tracing target for engine events.
const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Errors opening or preparing the engine database.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The database file could not be opened.
    #[error("failed to open engine database at '{path}': {source}")]
    Open {
        /// Path that was attempted.
        path: String,
        /// Underlying driver failure.
        #[source]
        source: rusqlite::Error,
    },

    /// A schema statement failed against the open database.
    #[error("failed to apply engine schema: {0}")]
    Schema(#[source] rusqlite::Error),
}

/// SQLite engine serving scoped hook transactions.
pub struct SqliteEngine {
    connection: Mutex<Connection>,
}

impl SqliteEngine {
    /// Opens (creating if absent) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Open`] when the file cannot be opened or
    /// created.
    pub fn open(path: &Utf8Path) -> Result<Self, EngineError> {
        let connection = Connection::open(path).map_err(|source| EngineError::Open {
            path: path.to_string(),
            source,
        })?;
        debug!(target: ENGINE_TARGET, %path, "opened engine database");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Open`] when the driver refuses the
    /// in-memory connection.
    pub fn open_in_memory() -> Result<Self, EngineError> {
        let connection = Connection::open_in_memory().map_err(|source| EngineError::Open {
            path: ":memory:".to_owned(),
            source,
        })?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Runs a batch of schema statements outside any hook transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Schema`] when a statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), EngineError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| EngineError::Schema(rusqlite::Error::InvalidQuery))?;
        connection.execute_batch(sql).map_err(EngineError::Schema)
    }

    #[cfg(test)]
    pub(crate) fn count_rows(&self, table: &str) -> Result<i64, EngineError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| EngineError::Schema(rusqlite::Error::InvalidQuery))?;
        connection
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .map_err(EngineError::Schema)
    }
}

impl TransactionSource for SqliteEngine {
    fn with_transaction(&self, work: TransactionWork<'_>) -> Result<(), PluginError> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| PluginError::transaction("engine connection is poisoned"))?;
        let transaction = connection
            .transaction()
            .map_err(|error| PluginError::transaction(error.to_string()))?;

        let mut scope = SqliteTransaction {
            transaction: &transaction,
        };
        work(&mut scope)?;

        transaction
            .commit()
            .map_err(|error| PluginError::transaction(error.to_string()))
    }
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SqliteEngine").finish_non_exhaustive()
    }
}

/// Live transaction handed to a hook for the duration of one call.
struct SqliteTransaction<'conn> {
    transaction: &'conn rusqlite::Transaction<'conn>,
}

impl PluginTransaction for SqliteTransaction<'_> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, PluginError> {
        let bound = bind_params(params)?;
        self.transaction
            .execute(sql, rusqlite::params_from_iter(bound))
            .map_err(|error| PluginError::transaction(error.to_string()))
    }

    fn query_rows(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Map<String, Value>>, PluginError> {
        let bound = bind_params(params)?;
        let mut statement = self
            .transaction
            .prepare(sql)
            .map_err(|error| PluginError::transaction(error.to_string()))?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut rows = statement
            .query(rusqlite::params_from_iter(bound))
            .map_err(|error| PluginError::transaction(error.to_string()))?;
        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|error| PluginError::transaction(error.to_string()))?
        {
            let mut object = Map::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value: SqlValue = row
                    .get(index)
                    .map_err(|error| PluginError::transaction(error.to_string()))?;
                object.insert(column.clone(), sql_to_json(value)?);
            }
            results.push(object);
        }
        Ok(results)
    }
}

fn bind_params(params: &[Value]) -> Result<Vec<SqlValue>, PluginError> {
    params.iter().map(json_to_sql).collect()
}

/// JSON parameters map to SQLite's four storage classes; composite
/// shapes are rejected rather than silently stringified.
fn json_to_sql(value: &Value) -> Result<SqlValue, PluginError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real))
            .ok_or_else(|| {
                PluginError::transaction(format!("number '{number}' is not representable"))
            }),
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(PluginError::transaction(
            "composite JSON values cannot be bound as SQL parameters",
        )),
    }
}

fn sql_to_json(value: SqlValue) -> Result<Value, PluginError> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Integer(integer) => Ok(Value::Number(integer.into())),
        SqlValue::Real(real) => Number::from_f64(real).map(Value::Number).ok_or_else(|| {
            PluginError::transaction(format!("column value '{real}' is not representable"))
        }),
        SqlValue::Text(text) => Ok(Value::String(text)),
        SqlValue::Blob(_) => Err(PluginError::transaction(
            "blob columns cannot be represented as JSON",
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn engine_with_notes() -> SqliteEngine {
        let engine = SqliteEngine::open_in_memory().expect("open engine");
        engine
            .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, title TEXT, score REAL)")
            .expect("create schema");
        engine
    }

    #[test]
    fn successful_work_is_committed() {
        let engine = engine_with_notes();
        engine
            .with_transaction(&mut |tx| {
                let changed = tx.execute(
                    "INSERT INTO notes (title, score) VALUES (?1, ?2)",
                    &[json!("first"), json!(0.5)],
                )?;
                assert_eq!(changed, 1);
                Ok(())
            })
            .expect("transaction commits");
        assert_eq!(engine.count_rows("notes").expect("count"), 1);
    }

    #[test]
    fn failing_work_is_rolled_back() {
        let engine = engine_with_notes();
        let error = engine
            .with_transaction(&mut |tx| {
                tx.execute("INSERT INTO notes (title) VALUES ('doomed')", &[])?;
                Err(PluginError::invocation("abandon the write"))
            })
            .expect_err("transaction rolls back");
        assert!(error.to_string().contains("abandon the write"));
        assert_eq!(engine.count_rows("notes").expect("count"), 0);
    }

    #[test]
    fn queries_round_trip_sqlite_storage_classes() {
        let engine = engine_with_notes();
        engine
            .with_transaction(&mut |tx| {
                tx.execute(
                    "INSERT INTO notes (id, title, score) VALUES (?1, ?2, ?3)",
                    &[json!(7), json!("seventh"), json!(2.5)],
                )?;
                let rows = tx.query_rows("SELECT id, title, score FROM notes", &[])?;
                assert_eq!(
                    rows,
                    vec![
                        json!({"id": 7, "title": "seventh", "score": 2.5})
                            .as_object()
                            .cloned()
                            .expect("row object")
                    ]
                );
                Ok(())
            })
            .expect("transaction commits");
    }

    #[test]
    fn composite_parameters_are_rejected() {
        let engine = engine_with_notes();
        let error = engine
            .with_transaction(&mut |tx| {
                tx.execute("INSERT INTO notes (title) VALUES (?1)", &[json!({"no": 1})])?;
                Ok(())
            })
            .expect_err("composite parameter rejected");
        assert!(error.to_string().contains("composite"));
    }

    #[test]
    fn null_and_boolean_parameters_bind() {
        let engine = engine_with_notes();
        engine
            .with_transaction(&mut |tx| {
                tx.execute(
                    "INSERT INTO notes (title, score) VALUES (?1, ?2)",
                    &[json!(null), json!(true)],
                )?;
                let rows = tx.query_rows("SELECT title, score FROM notes", &[])?;
                assert_eq!(rows[0]["title"], Value::Null);
                assert_eq!(rows[0]["score"], json!(1.0));
                Ok(())
            })
            .expect("transaction commits");
    }
}
