//! Resilient access to the source database connection.
//!
//! # Module Structure
//! - `adjustment`: per-platform session setup and type mappings
//! - `type_mapping`: registry filled by the adjustment
//! - `driver`: sqlx-backed [`Connector`] implementation
//!
//! [`ConnectionHandler`] hides where the connection comes from (injected or
//! opened from a [`DatabaseProfile`]), applies the platform adjustment exactly
//! once per binding, and transparently replaces connections that were dropped
//! by the server between row batches.
//!
//! Every operation is awaited sequentially and takes `&mut self`; a handler
//! is never shared. Hosts that dump tables in parallel create one handler per
//! worker.

mod adjustment;
mod driver;
mod type_mapping;

pub use adjustment::PlatformAdjustment;
pub use driver::{RawConnection, SqlxConnection, SqlxConnector};
pub use type_mapping::TypeMappings;

use crate::config::DatabaseProfile;
use crate::error::DumpError;
use crate::models::PlatformKind;
use adjustment::NOOP_ADJUSTMENT;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// A live connection as seen by the handler and the dump engines.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Driver-level handle for queries outside the portable surface.
    type Raw: Send;

    /// Platform this connection talks to.
    fn platform(&self) -> PlatformKind;

    /// Lightweight round-trip probe. A failed probe is not an error.
    async fn ping(&mut self) -> bool;

    /// Executes a statement and returns the number of affected rows.
    ///
    /// # Errors
    /// Returns [`DumpError::QueryExecution`] when the statement fails.
    async fn execute(&mut self, sql: &str) -> crate::Result<u64>;

    /// Closes the connection.
    ///
    /// # Errors
    /// Returns the driver error reported while closing.
    async fn close(self) -> crate::Result<()>
    where
        Self: Sized;

    /// Underlying driver handle.
    fn raw(&mut self) -> &mut Self::Raw;
}

/// Opens connections from a database profile.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced by this connector.
    type Connection: DatabaseConnection;

    /// Opens a new connection. A single attempt is made.
    ///
    /// # Errors
    /// Returns a configuration error for unusable profiles and
    /// [`DumpError::Connection`] when the driver fails.
    async fn open(&self, profile: &DatabaseProfile) -> crate::Result<Self::Connection>;
}

/// Binding state of a [`ConnectionHandler`].
enum Binding<K> {
    Unbound,
    Bound {
        connection: K,
        adjustment: PlatformAdjustment,
    },
}

impl<K> Binding<K> {
    fn connection_mut(&mut self) -> Option<&mut K> {
        match self {
            Self::Bound { connection, .. } => Some(connection),
            Self::Unbound => None,
        }
    }
}

/// Provides the live database connection to the dump engine.
///
/// # Example
/// ```rust,no_run
/// use tabledump_core::config::DatabaseProfile;
/// use tabledump_core::connection::{ConnectionHandler, SqlxConnector};
///
/// # async fn example() -> tabledump_core::Result<()> {
/// let profile = DatabaseProfile::new("mysql")
///     .with_host("localhost")
///     .with_user("dumper")
///     .with_database("shop");
/// let mut handler = ConnectionHandler::new(profile, SqlxConnector);
///
/// let platform = handler.platform().await?;
/// // ... fetch a batch of rows ...
/// handler.reconnect_if_necessary().await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionHandler<C: Connector> {
    profile: DatabaseProfile,
    connector: C,
    binding: Binding<C::Connection>,
    type_mappings: TypeMappings,
}

impl<C: Connector> std::fmt::Debug for ConnectionHandler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("profile", &self.profile)
            .field("bound", &self.is_bound())
            .field("adjustment", self.adjustment())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ConnectionHandler<C> {
    /// Creates an unbound handler; the connection is opened on first use.
    pub fn new(profile: DatabaseProfile, connector: C) -> Self {
        Self {
            profile,
            connector,
            binding: Binding::Unbound,
            type_mappings: TypeMappings::default(),
        }
    }

    /// Creates a handler around a connection the caller already opened.
    ///
    /// The platform adjustment is selected right away and its type mappings
    /// registered. The session itself is left as the caller set it up.
    pub fn with_connection(profile: DatabaseProfile, connector: C, connection: C::Connection) -> Self {
        let adjustment = PlatformAdjustment::for_platform(connection.platform(), &profile);
        debug!(
            platform = %connection.platform(),
            adjustment = adjustment.name(),
            "Using injected database connection"
        );

        let mut type_mappings = TypeMappings::default();
        adjustment.register_custom_type_mappings(&mut type_mappings);

        Self {
            profile,
            connector,
            binding: Binding::Bound {
                connection,
                adjustment,
            },
            type_mappings,
        }
    }

    /// Returns the live connection, opening and adjusting it on first use.
    ///
    /// # Errors
    /// Propagates connector and adjustment failures.
    pub async fn acquire(&mut self) -> crate::Result<&mut C::Connection> {
        if !self.is_bound() {
            self.bind().await?;
        }

        self.binding.connection_mut().ok_or_else(|| {
            DumpError::connection_failed(
                "Connection handler is not bound",
                std::io::Error::from(std::io::ErrorKind::NotConnected),
            )
        })
    }

    async fn bind(&mut self) -> crate::Result<()> {
        debug!(database = %self.profile, "Opening database connection");
        let mut connection = self.connector.open(&self.profile).await?;

        let platform = connection.platform();
        let adjustment = PlatformAdjustment::for_platform(platform, &self.profile);
        debug!(
            platform = %platform,
            adjustment = adjustment.name(),
            "Applying platform adjustment"
        );

        if let Err(e) = adjustment.init_connection(&mut connection).await {
            if let Err(close_error) = connection.close().await {
                warn!(error = %close_error, "Failed to close unadjusted database connection");
            }
            return Err(e);
        }

        let mut type_mappings = TypeMappings::default();
        adjustment.register_custom_type_mappings(&mut type_mappings);

        self.type_mappings = type_mappings;
        self.binding = Binding::Bound {
            connection,
            adjustment,
        };
        Ok(())
    }

    /// Replaces the connection if the server dropped it.
    ///
    /// Safe to call between row batches, but not while a cursor of the
    /// current connection is still being read. An unbound handler is bound.
    ///
    /// # Errors
    /// Propagates the failure of the single reconnection attempt.
    pub async fn reconnect_if_necessary(&mut self) -> crate::Result<()> {
        let alive = match self.binding.connection_mut() {
            Some(connection) => Some(connection.ping().await),
            None => None,
        };

        match alive {
            Some(true) => Ok(()),
            None => self.acquire().await.map(|_| ()),
            Some(false) => {
                info!(database = %self.profile, "Database connection lost, reconnecting");

                let stale = std::mem::replace(&mut self.binding, Binding::Unbound);
                self.type_mappings = TypeMappings::default();
                if let Binding::Bound { connection, .. } = stale
                    && let Err(e) = connection.close().await
                {
                    warn!(error = %e, "Failed to close stale database connection");
                }

                self.acquire().await.map(|_| ())
            }
        }
    }

    /// Platform of the active connection, connecting if necessary.
    ///
    /// # Errors
    /// Propagates connection failures.
    pub async fn platform(&mut self) -> crate::Result<PlatformKind> {
        Ok(self.acquire().await?.platform())
    }

    /// Driver-level handle of the active connection, connecting if necessary.
    ///
    /// # Errors
    /// Propagates connection failures.
    pub async fn low_level_handle(
        &mut self,
    ) -> crate::Result<&mut <C::Connection as DatabaseConnection>::Raw> {
        Ok(self.acquire().await?.raw())
    }

    /// Currently selected adjustment; [`PlatformAdjustment::Noop`] while unbound.
    pub fn adjustment(&self) -> &PlatformAdjustment {
        match &self.binding {
            Binding::Bound { adjustment, .. } => adjustment,
            Binding::Unbound => &NOOP_ADJUSTMENT,
        }
    }

    /// Type mappings registered for the current binding.
    pub fn type_mappings(&self) -> &TypeMappings {
        &self.type_mappings
    }

    /// Whether a connection is currently bound.
    pub fn is_bound(&self) -> bool {
        matches!(self.binding, Binding::Bound { .. })
    }

    /// Profile used to open connections.
    pub fn profile(&self) -> &DatabaseProfile {
        &self.profile
    }

    /// Closes the bound connection, if any, at the end of a dump run.
    ///
    /// # Errors
    /// Returns the driver error reported while closing.
    pub async fn close(self) -> crate::Result<()> {
        match self.binding {
            Binding::Bound { connection, .. } => connection.close().await,
            Binding::Unbound => Ok(()),
        }
    }
}
