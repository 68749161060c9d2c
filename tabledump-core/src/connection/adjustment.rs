//! Per-platform connection setup.

use super::{DatabaseConnection, TypeMappings};
use crate::config::DatabaseProfile;
use crate::error::DumpError;
use crate::models::{PlatformKind, PortableType};

/// Strategy applied once to every freshly bound connection.
///
/// Selection is a total match over [`PlatformKind`]; platforms without
/// quirks get [`PlatformAdjustment::Noop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformAdjustment {
    /// MySQL / MariaDB: session charset, read-only session, and mappings for
    /// column types portable tooling does not know
    MySql { charset: Option<String> },
    /// Nothing to adjust
    Noop,
}

pub(crate) static NOOP_ADJUSTMENT: PlatformAdjustment = PlatformAdjustment::Noop;

impl PlatformAdjustment {
    /// Selects the adjustment for a platform.
    pub fn for_platform(platform: PlatformKind, profile: &DatabaseProfile) -> Self {
        match platform {
            PlatformKind::MySql => Self::MySql {
                charset: profile.charset.clone(),
            },
            PlatformKind::PostgreSql | PlatformKind::Sqlite => Self::Noop,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MySql { .. } => "mysql",
            Self::Noop => "noop",
        }
    }

    /// Statements issued by [`PlatformAdjustment::init_connection`], in order.
    ///
    /// # Errors
    /// Returns a configuration error if the charset is not a plain identifier.
    pub fn init_statements(&self) -> crate::Result<Vec<String>> {
        match self {
            Self::MySql { charset } => {
                let mut statements = Vec::with_capacity(2);
                if let Some(charset) = charset {
                    if !crate::config::is_plain_identifier(charset) {
                        return Err(DumpError::configuration(format!(
                            "database.charset '{}' is not a valid character set name",
                            charset
                        )));
                    }
                    statements.push(format!("SET NAMES {}", charset));
                }
                statements.push("SET SESSION TRANSACTION READ ONLY".to_string());
                Ok(statements)
            }
            Self::Noop => Ok(Vec::new()),
        }
    }

    /// Initializes session-level settings on a new connection.
    ///
    /// # Errors
    /// Propagates the first failing statement.
    pub async fn init_connection<K>(&self, connection: &mut K) -> crate::Result<()>
    where
        K: DatabaseConnection,
    {
        for statement in self.init_statements()? {
            connection.execute(&statement).await?;
        }
        Ok(())
    }

    /// Registers the column type mappings this platform needs.
    pub fn register_custom_type_mappings(&self, mappings: &mut TypeMappings) {
        match self {
            Self::MySql { .. } => {
                mappings
                    .register("enum", PortableType::String)
                    .register("set", PortableType::String)
                    .register("bit", PortableType::Boolean);
            }
            Self::Noop => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_total() {
        let profile = DatabaseProfile::new("mysql").with_charset("utf8mb4");
        for platform in PlatformKind::ALL {
            let adjustment = PlatformAdjustment::for_platform(platform, &profile);
            match platform {
                PlatformKind::MySql => assert_eq!(
                    adjustment,
                    PlatformAdjustment::MySql {
                        charset: Some("utf8mb4".to_string())
                    }
                ),
                PlatformKind::PostgreSql | PlatformKind::Sqlite => {
                    assert_eq!(adjustment, PlatformAdjustment::Noop)
                }
            }
        }
    }

    #[test]
    fn test_mysql_init_statements() {
        let adjustment = PlatformAdjustment::MySql {
            charset: Some("utf8mb4".to_string()),
        };
        assert_eq!(
            adjustment.init_statements().unwrap(),
            ["SET NAMES utf8mb4", "SET SESSION TRANSACTION READ ONLY"]
        );

        let without_charset = PlatformAdjustment::MySql { charset: None };
        assert_eq!(
            without_charset.init_statements().unwrap(),
            ["SET SESSION TRANSACTION READ ONLY"]
        );
    }

    #[test]
    fn test_charset_injection_rejected() {
        let adjustment = PlatformAdjustment::MySql {
            charset: Some("utf8; DROP TABLE users".to_string()),
        };
        assert!(adjustment.init_statements().is_err());
    }

    #[test]
    fn test_type_mappings() {
        let mut mappings = TypeMappings::default();
        PlatformAdjustment::Noop.register_custom_type_mappings(&mut mappings);
        assert!(mappings.is_empty());

        PlatformAdjustment::MySql { charset: None }.register_custom_type_mappings(&mut mappings);
        assert_eq!(mappings.get("enum"), Some(&PortableType::String));
        assert_eq!(mappings.get("set"), Some(&PortableType::String));
        assert_eq!(mappings.get("bit"), Some(&PortableType::Boolean));
    }
}
