//! Authentication credentials
//!
//! This module provides the application credentials sent with every Mathpix request.

use std::fmt;

use crate::error::{Error, Result};

/// Environment variable holding the Mathpix application id.
pub const ENV_APP_ID: &str = "MATHPIX_APP_ID";

/// Environment variable holding the Mathpix application key.
pub const ENV_APP_KEY: &str = "MATHPIX_APP_KEY";

/// Application credentials for the Mathpix API
///
/// Sent as the `app_id` and `app_key` headers. The key is redacted from
/// [`Debug`] output.
#[derive(Clone, PartialEq, Eq)]
pub struct MpxCredentials {
    app_id: String,
    app_key: String,
}

impl MpxCredentials {
    /// Create credentials from an application id and key
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Result<Self> {
        let app_id = app_id.into();
        let app_key = app_key.into();

        if app_id.trim().is_empty() {
            return Err(Error::authentication("app_id must not be empty"));
        }
        if app_key.trim().is_empty() {
            return Err(Error::authentication("app_key must not be empty"));
        }

        Ok(Self { app_id, app_key })
    }

    /// Read credentials from `MATHPIX_APP_ID` and `MATHPIX_APP_KEY`
    pub fn from_env() -> Result<Self> {
        Self::resolve(None, None)
    }

    /// Use the explicit values where given, falling back to the environment
    pub fn resolve(app_id: Option<String>, app_key: Option<String>) -> Result<Self> {
        Self::resolve_with(app_id, app_key, |name| std::env::var(name).ok())
    }

    pub(crate) fn resolve_with(
        app_id: Option<String>,
        app_key: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let app_id = app_id.or_else(|| lookup(ENV_APP_ID)).ok_or_else(|| {
            Error::authentication(format!("app_id not provided and {ENV_APP_ID} is not set"))
        })?;
        let app_key = app_key.or_else(|| lookup(ENV_APP_KEY)).ok_or_else(|| {
            Error::authentication(format!("app_key not provided and {ENV_APP_KEY} is not set"))
        })?;

        Self::new(app_id, app_key)
    }

    /// Application id
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub(crate) fn app_key(&self) -> &str {
        &self.app_key
    }
}

impl fmt::Debug for MpxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpxCredentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"<redacted>")
            .finish()
    }
}
