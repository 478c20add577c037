//! Serial-number lookup service over a shared directory session.

use crate::{
    client::{escape_filter_value, LdapConnector, LdapSession, RealLdapConnector, SearchScope},
    config::{DirectoryConfig, EMAIL_ATTRIBUTE, SERIAL_NUMBER_ATTRIBUTE},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

const LOOKUP_ATTRIBUTES: &[&str] = &[SERIAL_NUMBER_ATTRIBUTE];

/// Looks up person serial numbers by email address.
///
/// The service holds one anonymous directory session, established on first
/// use and shared by every subsequent lookup. Construct it once at startup
/// and hand out references; there is no tear-down path, the session lives as
/// long as the service does.
pub struct DirectoryLookup {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
    session: OnceCell<Mutex<Box<dyn LdapSession>>>,
}

impl DirectoryLookup {
    /// Creates a lookup service that uses the real LDAP connector.
    ///
    /// No network activity happens here; the connection is established
    /// lazily by [`connect`](Self::connect) or the first lookup.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self {
            config,
            connector,
            session: OnceCell::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            session: OnceCell::new(),
        }
    }

    /// Eagerly establishes the shared directory session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the server is unreachable or rejects
    /// the anonymous bind. A failed attempt is not cached; a later call tries
    /// again.
    pub async fn connect(&self) -> Result<()> {
        self.session().await.map(|_| ())
    }

    /// Returns the serial number of the first directory entry whose email
    /// attribute matches `email`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the session cannot be established,
    /// [`Error::Search`] if the search fails or times out, and
    /// [`Error::NotFound`] if no entry matches or the matching entry carries
    /// no serial number.
    pub async fn lookup_serial_number(&self, email: &str) -> Result<String> {
        let session = self.session().await?;
        let filter = self.search_filter(email);
        debug!(%filter, base = self.config.search_base(), "searching directory");

        let entries = session
            .lock()
            .await
            .search(
                self.config.search_base(),
                SearchScope::Subtree,
                &filter,
                LOOKUP_ATTRIBUTES,
            )
            .await?;

        // Only the first entry is consulted, matching the server's ordering.
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no directory entry for {email}")))?;

        entry
            .first(SERIAL_NUMBER_ATTRIBUTE)
            .map(str::to_owned)
            .ok_or_else(|| {
                warn!(dn = %entry.dn, "matching entry has no serial number attribute");
                Error::NotFound(format!("no serial number has been found for {email}"))
            })
    }

    /// The shared session, connecting and binding anonymously on first use.
    /// `OnceCell` leaves the cell unset on failure, so concurrent callers
    /// share one attempt and a failed attempt can be retried later.
    async fn session(&self) -> Result<&Mutex<Box<dyn LdapSession>>> {
        self.session
            .get_or_try_init(|| async {
                let mut session = self.connector.connect().await?;
                session.anonymous_bind().await?;
                Ok(Mutex::new(session))
            })
            .await
    }

    /// Builds the person search filter for an email address.
    ///
    /// The value is interpolated verbatim unless filter escaping is enabled
    /// in the configuration; see [`DirectoryConfig::escape_filter_values`].
    fn search_filter(&self, email: &str) -> String {
        let value = if self.config.escape_filter_values() {
            escape_filter_value(email)
        } else {
            email.to_string()
        };
        format!(
            "(&(objectclass={})({EMAIL_ATTRIBUTE}={value}))",
            self.config.object_class()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LdapEntry, MockLdapConnector, MockLdapSession};
    use std::collections::HashMap;

    fn sample_config() -> DirectoryConfig {
        DirectoryConfig::new()
    }

    fn person_entry(email: &str, serial: Option<&str>) -> LdapEntry {
        let mut attributes = HashMap::new();
        attributes.insert(EMAIL_ATTRIBUTE.to_string(), vec![email.to_string()]);
        if let Some(serial) = serial {
            attributes.insert(
                SERIAL_NUMBER_ATTRIBUTE.to_string(),
                vec![serial.to_string()],
            );
        }
        LdapEntry {
            dn: format!("uid={email},ou=bluepages,o=ibm.com"),
            attributes,
        }
    }

    fn bound_session() -> MockLdapSession {
        let mut session = MockLdapSession::new();
        session.expect_anonymous_bind().returning(|| Ok(()));
        session
    }

    fn single_session_lookup(session: MockLdapSession) -> DirectoryLookup {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session)));
        DirectoryLookup::with_connector(sample_config(), Box::new(connector))
    }

    #[tokio::test]
    async fn lookup_returns_serial_number() {
        let mut session = bound_session();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![person_entry("alice@example.com", Some("12345"))])
        });

        let lookup = single_session_lookup(session);
        let serial = lookup
            .lookup_serial_number("alice@example.com")
            .await
            .unwrap();
        assert_eq!(serial, "12345");
    }

    #[tokio::test]
    async fn lookup_unknown_email_is_not_found() {
        let mut session = bound_session();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));

        let lookup = single_session_lookup(session);
        let result = lookup.lookup_serial_number("bob@example.com").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn entry_without_serial_number_is_not_found() {
        let mut session = bound_session();
        session
            .expect_search()
            .returning(|_, _, _, _| Ok(vec![person_entry("carol@example.com", None)]));

        let lookup = single_session_lookup(session);
        let result = lookup.lookup_serial_number("carol@example.com").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn multiple_matches_use_first_entry() {
        let mut session = bound_session();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![
                person_entry("dave@example.com", Some("11111")),
                person_entry("dave@example.com", Some("22222")),
            ])
        });

        let lookup = single_session_lookup(session);
        let serial = lookup
            .lookup_serial_number("dave@example.com")
            .await
            .unwrap();
        assert_eq!(serial, "11111");
    }

    #[tokio::test]
    async fn search_receives_scope_base_and_filter() {
        let mut session = bound_session();
        session
            .expect_search()
            .withf(|base, scope, filter, attributes| {
                base == "ou=bluepages,o=ibm.com"
                    && *scope == SearchScope::Subtree
                    && filter == "(&(objectclass=ibmPerson)(emailAddress=a@b.com))"
                    && attributes == [SERIAL_NUMBER_ATTRIBUTE]
            })
            .returning(|_, _, _, _| Ok(vec![person_entry("a@b.com", Some("99999"))]));

        let lookup = single_session_lookup(session);
        lookup.lookup_serial_number("a@b.com").await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .returning(|| Err(Error::Connection("connection refused".to_string())));

        let lookup = DirectoryLookup::with_connector(sample_config(), Box::new(connector));
        let result = lookup.connect().await;
        assert!(matches!(result, Err(Error::Connection(_))));

        let result = lookup.lookup_serial_number("alice@example.com").await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn lookups_share_one_connection() {
        let mut session = bound_session();
        session.expect_search().times(2).returning(|_, _, _, _| {
            Ok(vec![person_entry("alice@example.com", Some("12345"))])
        });

        let lookup = single_session_lookup(session);
        lookup
            .lookup_serial_number("alice@example.com")
            .await
            .unwrap();
        lookup
            .lookup_serial_number("alice@example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_first_lookups_share_one_connect() {
        let mut session = bound_session();
        session.expect_search().times(2).returning(|_, _, _, _| {
            Ok(vec![person_entry("alice@example.com", Some("12345"))])
        });

        let lookup = Arc::new(single_session_lookup(session));
        let first = tokio::spawn({
            let lookup = lookup.clone();
            async move { lookup.lookup_serial_number("alice@example.com").await }
        });
        let second = tokio::spawn({
            let lookup = lookup.clone();
            async move { lookup.lookup_serial_number("alice@example.com").await }
        });

        assert_eq!(first.await.unwrap().unwrap(), "12345");
        assert_eq!(second.await.unwrap().unwrap(), "12345");
    }

    #[tokio::test]
    async fn failed_connect_is_retried_on_next_call() {
        let mut connector = MockLdapConnector::new();
        let mut sequence = mockall::Sequence::new();
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut sequence)
            .return_once(|| Err(Error::Connection("connection refused".to_string())));

        let mut session = bound_session();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![person_entry("alice@example.com", Some("12345"))])
        });
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut sequence)
            .return_once(move || Ok(Box::new(session)));

        let lookup = DirectoryLookup::with_connector(sample_config(), Box::new(connector));
        let result = lookup.lookup_serial_number("alice@example.com").await;
        assert!(matches!(result, Err(Error::Connection(_))));

        let serial = lookup
            .lookup_serial_number("alice@example.com")
            .await
            .unwrap();
        assert_eq!(serial, "12345");
    }

    #[tokio::test]
    async fn bind_failure_surfaces_as_connection_error() {
        let mut session = MockLdapSession::new();
        session
            .expect_anonymous_bind()
            .returning(|| Err(Error::Connection("bind refused".to_string())));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));

        let lookup = DirectoryLookup::with_connector(sample_config(), Box::new(connector));
        let result = lookup.lookup_serial_number("alice@example.com").await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn search_failure_surfaces_as_search_error() {
        let mut session = bound_session();
        session
            .expect_search()
            .returning(|_, _, _, _| Err(Error::Search("busy".to_string())));

        let lookup = single_session_lookup(session);
        let result = lookup.lookup_serial_number("alice@example.com").await;
        assert!(matches!(result, Err(Error::Search(_))));
    }

    #[test]
    fn filter_interpolates_verbatim_by_default() {
        let lookup = DirectoryLookup::with_connector(
            sample_config(),
            Box::new(MockLdapConnector::new()),
        );
        assert_eq!(
            lookup.search_filter("a@b.com"),
            "(&(objectclass=ibmPerson)(emailAddress=a@b.com))"
        );
        // Special filter characters pass through untouched.
        assert_eq!(
            lookup.search_filter("*)(objectclass=*"),
            "(&(objectclass=ibmPerson)(emailAddress=*)(objectclass=*))"
        );
    }

    #[test]
    fn filter_escaping_can_be_opted_into() {
        let lookup = DirectoryLookup::with_connector(
            sample_config().with_filter_escaping(true),
            Box::new(MockLdapConnector::new()),
        );
        assert_eq!(
            lookup.search_filter("*)(objectclass=*"),
            "(&(objectclass=ibmPerson)(emailAddress=\\2a\\29\\28objectclass=\\2a))"
        );
    }

    #[test]
    fn filter_honors_configured_object_class() {
        let lookup = DirectoryLookup::with_connector(
            sample_config().with_object_class("person"),
            Box::new(MockLdapConnector::new()),
        );
        assert_eq!(
            lookup.search_filter("a@b.com"),
            "(&(objectclass=person)(emailAddress=a@b.com))"
        );
    }
}
