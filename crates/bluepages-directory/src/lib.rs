//! Directory lookup of person serial numbers.
//!
//! This crate resolves an email address to the `serialNumber` attribute of
//! the matching person entry in a fixed LDAP directory. It wraps a single
//! anonymous directory session: connect once, search by email, read one
//! attribute. Everything heavier (wire protocol, TLS, paging) is delegated
//! to `ldap3`.

#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod lookup;

pub use client::{LdapEntry, SearchScope};
pub use config::{
    DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_OBJECT_CLASS, DEFAULT_OPERATION_TIMEOUT_SECS,
    DEFAULT_SEARCH_BASE, DEFAULT_SERVER_URL, EMAIL_ATTRIBUTE, SERIAL_NUMBER_ATTRIBUTE,
};
pub use error::{Error, Result};
pub use lookup::DirectoryLookup;
