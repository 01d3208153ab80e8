use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::domain::{NewUser, User, UserPatch};
use super::repo::UserRepository;
use crate::error::{Error, Result};

/// Reference adapter keeping users in process memory, listed in insertion
/// order. Every call runs under the single mutex, so the uniqueness checks
/// in `create` and `update` are atomic with the write.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new: NewUser) -> Result<User> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        if users.iter().any(|u| u.email == new.email) {
            return Err(Error::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let users = self.users.lock().expect("user store lock poisoned");
        Ok(users.clone())
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let users = self.users.lock().expect("user store lock poisoned");
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User> {
        let users = self.users.lock().expect("user store lock poisoned");
        users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        let position = users.iter().position(|u| u.id == id).ok_or(Error::NotFound)?;
        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.email == *email && u.id != id) {
                return Err(Error::Conflict);
            }
        }
        let user = &mut users[position];
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        let position = users.iter().position(|u| u.id == id).ok_or(Error::NotFound)?;
        users.remove(position);
        Ok(())
    }
}
