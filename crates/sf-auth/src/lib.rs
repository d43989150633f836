//! # forcepipe-auth
//!
//! The credential boundary. Acquiring or refreshing tokens is out of scope:
//! callers obtain a bearer token however they like and hand it over through
//! [`Credentials`]. An expired token surfaces as an authentication error from
//! the first request that uses it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcepipe_auth::{Credentials, SalesforceCredentials};
//! use forcepipe_client::ClientConfig;
//!
//! let creds = SalesforceCredentials::from_env()?;
//! let client = creds.client(ClientConfig::default())?;
//! ```

mod credentials;
mod error;

pub use credentials::{Credentials, SalesforceCredentials};
pub use error::{Error, ErrorKind, Result};
