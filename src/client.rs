//! The top-level client for the remote users API.
use std::env;

use crate::{error::Result, http, users};

/// The public demo API the dashboard talks to by default.
pub(crate) static DEFAULT_URL: &str = "https://jsonplaceholder.typicode.com";

/// The client is the entrypoint for everything remote.
///
/// You can create it using [`Client::builder`] or [`Client::new`].
///
/// # Examples
/// ```
/// use userdesk::{Client, Error};
///
/// fn main() -> Result<(), Error> {
///     // Use the URL from USERDESK_URL, or the public default.
///     let client = Client::new()?;
///
///     // Point the client somewhere else and ignore the environment.
///     let client = Client::builder()
///         .no_env()
///         .with_url("http://localhost:3000")
///         .build()?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    pub users: users::Client,
}

impl Client {
    /// Creates a new client. If you want to configure it, use [`Client::builder`].
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a new client using a builder.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Get the url (cloned).
    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Get client version.
    pub fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// This builder is used to create a new client.
pub struct Builder {
    env_fallback: bool,
    url: Option<String>,
}

impl Builder {
    /// Create a new builder.
    fn new() -> Self {
        Self {
            env_fallback: true,
            url: None,
        }
    }

    /// Don't fall back to environment variables.
    pub fn no_env(mut self) -> Self {
        self.env_fallback = false;
        self
    }

    /// Set the base URL of the users API. If this is not set, the URL will be
    /// read from the environment variable `USERDESK_URL`, and failing that the
    /// public JSONPlaceholder API is used.
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let mut url = self.url.unwrap_or_default();
        if url.is_empty() && self.env_fallback {
            url = env::var("USERDESK_URL").unwrap_or_default();
        }
        if url.is_empty() {
            url = DEFAULT_URL.to_string();
        }

        // Paths are joined relative to the base, which needs a trailing slash
        // to keep its own path segments.
        let mut base = url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let http_client = http::Client::new(base)?;
        tracing::debug!(base_url = %http_client.base_url(), "built users client");

        Ok(Client {
            url,
            users: users::Client::new(http_client),
        })
    }
}
