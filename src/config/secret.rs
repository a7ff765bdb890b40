//! Secret configuration values
//!
//! Connection strings carry database passwords. They are held in a
//! `secrecy::Secret` so they are zeroed on drop, redacted in `Debug` output
//! and only readable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use nocturne_decomposer::config::{redacted_connection_string, secret_string};
//! use secrecy::ExposeSecret;
//!
//! let conn = secret_string("postgresql://app:hunter2@db:5432/nocturne".to_string());
//! assert!(!format!("{conn:?}").contains("hunter2"));
//! assert_eq!(redacted_connection_string(&conn), "postgresql://***@db:5432/nocturne");
//! assert!(conn.expose_secret().starts_with("postgresql://"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`], zeroized on drop
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parse the value, e.g. into a `tokio_postgres::Config`
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Zeroized, debug-redacted string
pub type SecretString = Secret<SecretValue>;

/// Wrap a string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Connection string with credentials replaced by `***`, safe to log
pub fn redacted_connection_string(conn: &SecretString) -> String {
    let raw = conn.expose_secret().as_ref();
    let scheme = raw
        .split_once("://")
        .map_or("postgresql", |(scheme, _)| scheme);

    match raw.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => format!("{scheme}://***"),
    }
}
