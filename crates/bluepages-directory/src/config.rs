//! Configuration for the directory lookup client.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default directory server endpoint.
pub const DEFAULT_SERVER_URL: &str = "ldaps://bluepages.ibm.com:636";
/// Default base distinguished name for searches.
pub const DEFAULT_SEARCH_BASE: &str = "ou=bluepages,o=ibm.com";
/// Default object class matched by person lookups.
pub const DEFAULT_OBJECT_CLASS: &str = "ibmPerson";
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds), matching the upstream search time limit.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Attribute holding a person's email address.
pub const EMAIL_ATTRIBUTE: &str = "emailAddress";
/// Attribute holding a person's serial number.
pub const SERIAL_NUMBER_ATTRIBUTE: &str = "serialNumber";

/// Configuration for connecting to the directory server.
///
/// [`DirectoryConfig::new`] yields the compiled-in defaults; the builder
/// methods exist for tests and deployment-specific wiring.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    url: String,
    search_base: String,
    object_class: String,
    escape_filter_values: bool,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Creates a configuration with the compiled-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            search_base: DEFAULT_SEARCH_BASE.to_string(),
            object_class: DEFAULT_OBJECT_CLASS.to_string(),
            escape_filter_values: false,
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }

    /// Returns the directory endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the base distinguished name searches are scoped to.
    #[must_use]
    pub fn search_base(&self) -> &str {
        &self.search_base
    }

    /// Returns the object class matched by person lookups.
    #[must_use]
    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    /// Returns whether filter values are escaped before interpolation.
    ///
    /// Off by default: the upstream behavior embeds the email verbatim in the
    /// search filter, so callers must not pass attacker-controlled input
    /// unless this is enabled.
    #[must_use]
    pub const fn escape_filter_values(&self) -> bool {
        self.escape_filter_values
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Overrides the directory endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be parsed.
    pub fn with_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url_string = url.into();
        Url::parse(&url_string).map_err(Error::from)?;
        self.url = url_string;
        Ok(self)
    }

    /// Overrides the base distinguished name.
    #[must_use]
    pub fn with_search_base(mut self, base: impl Into<String>) -> Self {
        self.search_base = base.into();
        self
    }

    /// Overrides the object class matched by person lookups.
    #[must_use]
    pub fn with_object_class(mut self, object_class: impl Into<String>) -> Self {
        self.object_class = object_class.into();
        self
    }

    /// Enables or disables RFC 4515 escaping of filter values.
    #[must_use]
    pub const fn with_filter_escaping(mut self, escape: bool) -> Self {
        self.escape_filter_values = escape;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
