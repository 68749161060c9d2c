//! Core configuration and connection handling for tabledump.
//!
//! This crate turns a declarative dump configuration (which database to
//! read, which tables to export, how to filter their rows) into a resolved
//! table graph, and provides a resilient handle to the source database for
//! the dump engines.
//!
//! # Guarantees
//! - Resolution either fails or yields a graph where every data-dependent
//!   filter points at a declared table that collects the referenced column
//! - Credentials never appear in logs, errors or `Debug` output
//! - MySQL sessions are switched to read-only before use
//!
//! # Architecture
//! - [`config`]: configuration root, table/column/filter declarations and
//!   the engine registry
//! - [`connection`]: connection handler, sqlx connector and per-platform
//!   adjustments
//! - [`error`]: the crate-wide [`DumpError`]

#[cfg(not(any(feature = "mysql", feature = "postgresql", feature = "sqlite")))]
compile_error!("enable at least one database feature: mysql, postgresql or sqlite");

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::{
    ColumnDeclaration, DatabaseProfile, DumperConfig, EngineRegistry, FilterDeclaration,
    OutputProfile, TableDeclaration,
};
pub use connection::{
    ConnectionHandler, Connector, DatabaseConnection, PlatformAdjustment, SqlxConnector,
    TypeMappings,
};
pub use error::{DumpError, Result};
pub use logging::init_logging;
pub use models::{PlatformKind, PortableType};
