use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User, UserChanges},
};

/// Process-local `UserStore`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<u32, User>,
    last_id: u32,
}

impl Inner {
    /// Same uniqueness rules as the `users` table: email always, phone when set.
    fn check_unique(&self, email: &str, phone: &str, except: Option<u32>) -> Result<(), StoreError> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.email == email {
                return Err(StoreError::UniqueViolation("users_email_key".into()));
            }
            if !phone.is_empty() && user.phone == phone {
                return Err(StoreError::UniqueViolation("users_phone_key".into()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn find_by_id(&self, id: u32) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_unique(&user.email, &user.phone, None)?;
        let id = inner.last_id.checked_add(1).ok_or(StoreError::IdsExhausted)?;

        let now = OffsetDateTime::now_utc();
        let created = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.last_id = id;
        inner.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update_by_id(&self, id: u32, changes: UserChanges) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        inner.check_unique(&changes.email, &changes.phone, Some(id))?;

        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.first_name = changes.first_name;
        user.last_name = changes.last_name;
        user.email = changes.email;
        user.phone = changes.phone;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn delete_by_id(&self, id: u32) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
