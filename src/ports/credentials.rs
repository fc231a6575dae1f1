//! Credential lookup contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::ports::marketplace::Credentials;

/// Resolves a user's marketplace credentials. The backing store (secrets
/// manager, encrypted table) lives entirely outside this crate.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn credentials_for(&self, user_id: &str) -> Result<Option<Credentials>>;

    /// Invoked by the engine after a `CredentialRevoked` error so the chat
    /// layer can prompt the user to re-authenticate.
    async fn clear(&self, user_id: &str) -> Result<()>;
}
