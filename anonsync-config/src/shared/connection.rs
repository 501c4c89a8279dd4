use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::shared::ValidationError;

/// Connection settings for the MongoDB deployment.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking the connection string (which embeds credentials) in
/// serialized forms.
#[derive(Clone, Debug, Deserialize)]
pub struct MongoConnectionConfig {
    /// Connection string URI, including credentials.
    pub uri: SecretString,
    /// Database holding the source, output, and checkpoint collections.
    pub database: String,
}

impl MongoConnectionConfig {
    /// Creates a connection configuration from plain strings.
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: SecretString::new(uri.into()),
            database: database.into(),
        }
    }

    /// Validates the connection configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.uri.expose_secret().is_empty() {
            return Err(ValidationError::MissingConnectionUri);
        }
        if self.database.is_empty() {
            return Err(ValidationError::MissingDatabaseName);
        }

        Ok(())
    }
}
