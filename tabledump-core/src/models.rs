//! Shared vocabulary for platforms and column types.

use serde::{Deserialize, Serialize};

/// Database platforms the connector knows how to open.
///
/// The set is closed: every kind must be handled wherever platforms are
/// matched, including by [`PlatformAdjustment`](crate::connection::PlatformAdjustment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    MySql,
    PostgreSql,
    Sqlite,
}

impl PlatformKind {
    /// All supported platforms, in lookup order.
    pub const ALL: [Self; 3] = [Self::MySql, Self::PostgreSql, Self::Sqlite];

    /// Classifies a configured driver name.
    ///
    /// Accepts the bare engine names as well as the common `pdo_*` style
    /// aliases found in existing dump configurations.
    ///
    /// # Example
    /// ```rust
    /// use tabledump_core::models::PlatformKind;
    ///
    /// assert_eq!(PlatformKind::from_driver("pdo_mysql"), Some(PlatformKind::MySql));
    /// assert_eq!(PlatformKind::from_driver("oracle"), None);
    /// ```
    pub fn from_driver(driver: &str) -> Option<Self> {
        let driver = driver.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|platform| platform.aliases().iter().any(|alias| *alias == driver))
    }

    /// Driver names accepted for this platform, canonical name first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::MySql => &["mysql", "mysqli", "mariadb", "pdo_mysql"],
            Self::PostgreSql => &["postgres", "postgresql", "pgsql", "pdo_pgsql"],
            Self::Sqlite => &["sqlite", "sqlite3", "pdo_sqlite"],
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::MySql => write!(f, "MySQL"),
            PlatformKind::PostgreSql => write!(f, "PostgreSQL"),
            PlatformKind::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// Engine-independent column type a native type can be mapped onto.
///
/// Only the targets platform adjustments actually register are listed;
/// native types without a custom mapping keep the driver's own mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortableType {
    String,
    Boolean,
}

impl std::fmt::Display for PortableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PortableType::String => "string",
            PortableType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}
