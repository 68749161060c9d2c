//! Database connection profile.

use crate::error::DumpError;
use crate::models::PlatformKind;
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroizing;

/// Settings used to open the source database connection.
///
/// # Security
/// The password lives in a `Zeroizing` container, is skipped on
/// serialization and is omitted from both `Debug` and `Display`.
///
/// # Example
/// ```rust
/// use tabledump_core::config::DatabaseProfile;
///
/// let profile = DatabaseProfile::new("mysql")
///     .with_host("localhost")
///     .with_user("dumper")
///     .with_password("secret")
///     .with_database("shop");
///
/// assert!(profile.validate().is_ok());
/// assert!(!format!("{profile}").contains("secret"));
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseProfile {
    /// Driver name, e.g. `mysql`, `pdo_pgsql`, `sqlite`
    pub driver: Option<String>,
    /// Server host
    pub host: Option<String>,
    /// Server port (driver default when absent)
    pub port: Option<u16>,
    /// Login user
    pub user: Option<String>,
    #[serde(
        default = "no_password",
        deserialize_with = "deserialize_password",
        skip_serializing
    )]
    password: Zeroizing<Option<String>>,
    /// Database (schema) name; a file path for SQLite
    pub dbname: Option<String>,
    /// Connection character set
    pub charset: Option<String>,
}

fn no_password() -> Zeroizing<Option<String>> {
    Zeroizing::new(None)
}

fn deserialize_password<'de, D>(deserializer: D) -> Result<Zeroizing<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Zeroizing::new)
}

impl Default for DatabaseProfile {
    fn default() -> Self {
        Self {
            driver: None,
            host: None,
            port: None,
            user: None,
            password: no_password(),
            dbname: None,
            charset: None,
        }
    }
}

impl std::fmt::Debug for DatabaseProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseProfile")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("charset", &self.charset)
            // user and password are intentionally omitted
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for DatabaseProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}{}/{}",
            self.driver.as_deref().unwrap_or("<no driver>"),
            self.host.as_deref().unwrap_or(""),
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.dbname.as_deref().unwrap_or("")
        )
    }
}

impl DatabaseProfile {
    /// Creates a profile for the given driver.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: Some(driver.into()),
            ..Default::default()
        }
    }

    /// Builder method to set host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Builder method to set password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Zeroizing::new(Some(password.into()));
        self
    }

    /// Builder method to set database name.
    pub fn with_database(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    /// Builder method to set character set.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Returns the password, if one was configured.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if a password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Classifies the configured driver.
    ///
    /// # Errors
    /// Returns a configuration error when no driver is set or the driver is
    /// not one of the supported platforms.
    pub fn platform(&self) -> crate::Result<PlatformKind> {
        let driver = self
            .driver
            .as_deref()
            .ok_or_else(|| DumpError::configuration("database.driver is required"))?;

        PlatformKind::from_driver(driver).ok_or_else(|| {
            DumpError::configuration(format!("database.driver '{}' is not supported", driver))
        })
    }

    /// Validates the profile values that are present.
    ///
    /// An empty profile is valid: it only fails once a connection is opened.
    ///
    /// # Errors
    /// Returns error if the driver is unknown, the port is zero, or the
    /// charset is not a plain identifier.
    pub fn validate(&self) -> crate::Result<()> {
        if self.driver.is_some() {
            self.platform()?;
        }

        if self.port == Some(0) {
            return Err(DumpError::configuration(
                "database.port must be greater than 0",
            ));
        }

        if let Some(charset) = &self.charset
            && !is_plain_identifier(charset)
        {
            return Err(DumpError::configuration(format!(
                "database.charset '{}' is not a valid character set name",
                charset
            )));
        }

        Ok(())
    }
}

/// True for non-empty ASCII identifiers (`utf8mb4`, `latin1`, `UTF8`).
pub(crate) fn is_plain_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
