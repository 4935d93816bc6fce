//! Scoped transactional access for record hooks.
//!
//! A hook runs inside exactly one transaction owned by that single call.
//! The [`TransactionSource`] contract guarantees release on every exit
//! path: the implementation commits when the hook returns `Ok` and rolls
//! back when it returns `Err`, so hook code never manages the scope
//! itself.

use serde_json::{Map, Value};

use crate::error::PluginError;

/// Statement-level access to the engine inside one hook's transaction.
pub trait PluginTransaction {
    /// Executes a statement, returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Transaction`] when the statement fails or a
    /// parameter cannot be bound.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, PluginError>;

    /// Runs a query, returning each row as a column-name-to-value map.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Transaction`] when the query fails or a
    /// column value cannot be represented as JSON.
    fn query_rows(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Map<String, Value>>, PluginError>;
}

/// Work item executed inside a scoped transaction.
pub type TransactionWork<'a> =
    &'a mut dyn FnMut(&mut dyn PluginTransaction) -> Result<(), PluginError>;

/// Provider of scoped transactions, one per hook invocation.
pub trait TransactionSource: Send + Sync {
    /// Runs `work` inside a fresh transaction.
    ///
    /// The transaction commits when `work` returns `Ok` and rolls back
    /// when it returns `Err`; either way the underlying connection is
    /// released before this method returns.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `work`, or a
    /// [`PluginError::Transaction`] raised while opening, committing, or
    /// rolling back the scope.
    fn with_transaction(&self, work: TransactionWork<'_>) -> Result<(), PluginError>;
}
