use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    repo::{CredentialStore, StoreError},
    repo_types::UserRecord,
};

/// In-process store keyed by email. Used for local runs without Postgres and in tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<Uuid, StoreError> {
        let mut users = self.users.lock().await;
        if users.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            registered_at: OffsetDateTime::now_utc(),
            last_login_at: None,
        };
        let id = record.id;
        users.insert(record.email.clone(), record);
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.lock().await.get(email).cloned())
    }

    async fn update_last_login(
        &self,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.values_mut().find(|u| u.id == user_id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}
