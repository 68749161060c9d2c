//! Error types for configuration resolution and database connections.
//!
//! Connection errors carry context strings built from the profile's
//! `Display`, which never includes the user or password.

use thiserror::Error;

/// Main error type for tabledump operations.
///
/// # Security
/// Messages never include credentials. Driver errors are kept as the
/// `source` so callers can inspect them without them leaking into `Display`.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Malformed or inconsistent configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A data-dependent filter points at a table that is neither declared
    /// nor reachable as a dependency
    #[error("Referenced table not declared: '{table}' (referenced by {referenced_by})")]
    UndeclaredTable {
        table: String,
        referenced_by: String,
    },

    /// The dependency graph contains a cycle
    #[error("Dependency cycle between tables: {}", tables.join(" -> "))]
    DependencyCycle { tables: Vec<String> },

    /// Opening or re-opening a database connection failed
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A statement issued on an open connection failed
    #[error("Query execution failed: {context}")]
    QueryExecution {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for Results with DumpError
pub type Result<T> = std::result::Result<T, DumpError>;

impl DumpError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an undeclared-table error for a filter on `table.column`
    pub fn undeclared_table(table: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        Self::UndeclaredTable {
            table: table.into(),
            referenced_by: referenced_by.into(),
        }
    }

    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a query execution error
    pub fn query_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::QueryExecution {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Returns true for errors raised while resolving configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::UndeclaredTable { .. } | Self::DependencyCycle { .. }
        )
    }
}
