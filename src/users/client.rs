use async_trait::async_trait;
use tracing::instrument;

use crate::{
    error::Result,
    http,
    users::model::{decode_users, RemoteUser, User},
};

/// Anything the store can seed its user list from.
///
/// [`Client`] is the production implementation; tests hand the store a stub.
#[async_trait]
pub trait UserSource: Send + Sync {
    /// Fetch the full user collection in one call.
    async fn fetch_users(&self) -> Result<Vec<User>>;
}

/// Provides methods to work with the remote users collection.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: http::Client,
}

impl Client {
    pub(crate) fn new(http_client: http::Client) -> Self {
        Self { http_client }
    }

    /// Retrieve every user. This is a single round trip with no pagination.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<User>> {
        let remote: Vec<RemoteUser> = self.http_client.get("/users").await?.json().await?;
        decode_users(remote)
    }
}

#[async_trait]
impl UserSource for Client {
    async fn fetch_users(&self) -> Result<Vec<User>> {
        self.list().await
    }
}
