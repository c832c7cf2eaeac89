//! Mathpix client module
//!
//! This module provides the client interface for the Mathpix v3 API.
//! It handles authentication, request/response processing, and retries.

mod credentials;
mod mpx_client;
mod mpx_config;
mod source;

pub use credentials::{ENV_APP_ID, ENV_APP_KEY, MpxCredentials};
pub use mpx_client::MpxClient;
pub use mpx_config::{ENV_API_URL, MpxBuilder, MpxBuilderError, MpxConfig, PRODUCTION_API_URL};
pub use source::DocumentSource;
