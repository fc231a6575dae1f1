//! Fixed `CredentialStore` test double.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Result;
use crate::ports::{CredentialStore, Credentials};

#[derive(Default)]
pub struct FixedCredentialStore {
    credentials: Mutex<HashMap<String, Credentials>>,
    cleared: Mutex<Vec<String>>,
}

impl FixedCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(user_id: impl Into<String>, credentials: Credentials) -> Self {
        let store = Self::new();
        store.credentials.lock().insert(user_id.into(), credentials);
        store
    }

    #[must_use]
    pub fn cleared_users(&self) -> Vec<String> {
        self.cleared.lock().clone()
    }
}

#[async_trait]
impl CredentialStore for FixedCredentialStore {
    async fn credentials_for(&self, user_id: &str) -> Result<Option<Credentials>> {
        Ok(self.credentials.lock().get(user_id).cloned())
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        self.credentials.lock().remove(user_id);
        self.cleared.lock().push(user_id.to_string());
        Ok(())
    }
}
