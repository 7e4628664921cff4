//! Pool configuration.

use std::fmt;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 27017;

/// Default database name.
pub const DEFAULT_DATABASE: &str = "courseWeb";

/// Default value for every pool size field (initial, minimum, maximum).
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Configuration for the connection pool.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future minor versions without breaking changes. Use the builder
/// pattern methods or [`Default::default()`] to construct instances.
///
/// Every field has a documented default; fields left at an invalid value
/// (an empty string, a zero port, a zero size) fall back to that default
/// when the pool is constructed rather than failing construction. See
/// [`PoolOptions::normalized`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PoolOptions {
    /// Server host name or address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Database name that opened connections are bound to.
    pub database: String,

    /// Number of connections opened at pool construction. This is also
    /// the starting value of the pool's elastic target size.
    pub initial_size: usize,

    /// Floor below which idle connections are never closed as surplus.
    pub min_size: usize,

    /// Ceiling the elastic target size may never exceed.
    pub max_size: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            initial_size: DEFAULT_POOL_SIZE,
            min_size: DEFAULT_POOL_SIZE,
            max_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl PoolOptions {
    /// Create pool options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the number of connections opened at construction.
    #[must_use]
    pub fn initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Set the idle-connection floor.
    #[must_use]
    pub fn min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Set the elastic-capacity ceiling.
    #[must_use]
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Replace invalid fields with their documented defaults.
    ///
    /// An empty host or database name, a zero port, or a zero size cannot
    /// describe a usable pool; each such field falls back to its default
    /// instead of failing. The pool applies this at construction, so a
    /// caller never needs to invoke it directly.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.host.is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.database.is_empty() {
            self.database = DEFAULT_DATABASE.to_string();
        }
        if self.initial_size == 0 {
            self.initial_size = DEFAULT_POOL_SIZE;
        }
        if self.min_size == 0 {
            self.min_size = DEFAULT_POOL_SIZE;
        }
        if self.max_size == 0 {
            self.max_size = DEFAULT_POOL_SIZE;
        }
        self
    }

    /// Build the connection target handed to the [`ConnectionFactory`].
    ///
    /// [`ConnectionFactory`]: crate::ConnectionFactory
    #[must_use]
    pub fn target(&self) -> PoolTarget {
        PoolTarget {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
        }
    }
}

/// Where the factory should open connections: host, port and the database
/// the session is bound to.
///
/// Derived from [`PoolOptions`] once at pool construction and shared with
/// every factory call, so the factory never sees pool-sizing concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTarget {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
}

impl fmt::Display for PoolTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PoolOptions::default();
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.database, DEFAULT_DATABASE);
        assert_eq!(options.initial_size, DEFAULT_POOL_SIZE);
        assert_eq!(options.min_size, DEFAULT_POOL_SIZE);
        assert_eq!(options.max_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_builder_methods() {
        let options = PoolOptions::new()
            .host("db.internal")
            .port(27018)
            .database("orders")
            .initial_size(3)
            .min_size(2)
            .max_size(12);

        assert_eq!(options.host, "db.internal");
        assert_eq!(options.port, 27018);
        assert_eq!(options.database, "orders");
        assert_eq!(options.initial_size, 3);
        assert_eq!(options.min_size, 2);
        assert_eq!(options.max_size, 12);
    }

    #[test]
    fn test_normalized_replaces_invalid_fields() {
        let options = PoolOptions::new()
            .host("")
            .port(0)
            .database("")
            .initial_size(0)
            .min_size(0)
            .max_size(0)
            .normalized();

        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.database, DEFAULT_DATABASE);
        assert_eq!(options.initial_size, DEFAULT_POOL_SIZE);
        assert_eq!(options.min_size, DEFAULT_POOL_SIZE);
        assert_eq!(options.max_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_normalized_keeps_valid_fields() {
        let options = PoolOptions::new()
            .host("db.internal")
            .initial_size(4)
            .min_size(2)
            .max_size(0)
            .normalized();

        assert_eq!(options.host, "db.internal");
        assert_eq!(options.initial_size, 4);
        assert_eq!(options.min_size, 2);
        assert_eq!(options.max_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_target_formatting() {
        let target = PoolOptions::new().database("orders").target();
        assert_eq!(target.host, DEFAULT_HOST);
        assert_eq!(target.port, DEFAULT_PORT);
        assert_eq!(target.database, "orders");
        assert_eq!(target.to_string(), "127.0.0.1:27017/orders");
    }
}
