use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{Error, Result};

use super::domain::{NewUser, PublicUser, UserPatch};
use super::repo::UserRepository;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| Error::InvalidId)
}

/// Orchestrates registration, login and profile CRUD over the repository
/// port and the credential/session codecs. Holds no state of its own.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    jwt: JwtKeys,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, jwt: JwtKeys) -> Self {
        Self { repo, jwt }
    }

    /// Registers a new user. No token is issued here; the client logs in
    /// separately.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<PublicUser> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput("Missing fields"));
        }
        if !is_valid_email(email) {
            return Err(Error::InvalidInput("Invalid email"));
        }

        // Advisory duplicate check; the storage constraint stays
        // authoritative when two registrations race past it.
        match self.repo.find_by_email(email).await {
            Ok(_) => return Err(Error::Conflict),
            Err(Error::NotFound) => {}
            // Fail closed: an ambiguous lookup must not fall through to create.
            Err(e) => return Err(e),
        }

        let password_hash = hash_password(password)?;
        let user = self
            .repo
            .create(NewUser {
                name: name.to_owned(),
                email: email.to_owned(),
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user.into())
    }

    /// Authenticates and mints a session token. Unknown email and wrong
    /// password are rejected identically so registered emails can't be
    /// probed.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let user = match self.repo.find_by_email(email).await {
            Ok(u) => u,
            Err(Error::NotFound) => {
                warn!("login for unknown email");
                return Err(Error::Unauthenticated);
            }
            Err(e) => return Err(e),
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "login with invalid password");
            return Err(Error::Unauthenticated);
        }

        let token = self.jwt.sign(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    pub async fn list_users(&self) -> Result<Vec<PublicUser>> {
        let users = self.repo.list_all().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get_user(&self, id: &str) -> Result<PublicUser> {
        let id = parse_id(id)?;
        Ok(self.repo.find_by_id(id).await?.into())
    }

    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<PublicUser> {
        let id = parse_id(id)?;
        if patch.is_empty() {
            return Err(Error::InvalidInput("Nothing to update"));
        }
        if let Some(email) = &patch.email {
            if !is_valid_email(email) {
                return Err(Error::InvalidInput("Invalid email"));
            }
        }
        Ok(self.repo.update(id, patch).await?.into())
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        self.repo.delete(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::JwtConfig;
    use crate::users::domain::User;
    use crate::users::memory::InMemoryUserRepository;

    fn make_service() -> UserService {
        let jwt = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: 72,
        });
        UserService::new(Arc::new(InMemoryUserRepository::new()), jwt)
    }

    #[tokio::test]
    async fn register_then_list_shows_user() {
        let service = make_service();
        service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");
        let users = service.list_users().await.expect("list");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "alice@x.com");
        assert_eq!(users[0].name, "Alice");
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let service = make_service();
        for (name, email, password) in [
            ("", "a@x.com", "pw"),
            ("A", "", "pw"),
            ("A", "a@x.com", ""),
        ] {
            let err = service.register(name, email, password).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let service = make_service();
        let err = service.register("A", "not-an-email", "pw").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let service = make_service();
        service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");
        let err = service
            .register("Impostor", "alice@x.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict));
    }

    #[tokio::test]
    async fn register_fails_closed_on_ambiguous_lookup() {
        struct BrokenRepo;

        #[async_trait]
        impl UserRepository for BrokenRepo {
            async fn create(&self, _new: NewUser) -> Result<User> {
                panic!("create must not be reached after a failed lookup");
            }
            async fn list_all(&self) -> Result<Vec<User>> {
                Err(Error::Repository(anyhow::anyhow!("storage down")))
            }
            async fn find_by_email(&self, _email: &str) -> Result<User> {
                Err(Error::Repository(anyhow::anyhow!("storage down")))
            }
            async fn find_by_id(&self, _id: Uuid) -> Result<User> {
                Err(Error::Repository(anyhow::anyhow!("storage down")))
            }
            async fn update(&self, _id: Uuid, _patch: UserPatch) -> Result<User> {
                Err(Error::Repository(anyhow::anyhow!("storage down")))
            }
            async fn delete(&self, _id: Uuid) -> Result<()> {
                Err(Error::Repository(anyhow::anyhow!("storage down")))
            }
        }

        let jwt = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: 72,
        });
        let service = UserService::new(Arc::new(BrokenRepo), jwt);
        let err = service.register("A", "a@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Repository(_)));
    }

    #[tokio::test]
    async fn login_roundtrips_through_token() {
        let service = make_service();
        service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");
        let token = service.login("alice@x.com", "secret").await.expect("login");

        let jwt = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: 72,
        });
        let claims = jwt.verify(&token).expect("verify");
        assert_eq!(claims.email, "alice@x.com");
        let listed = service.list_users().await.expect("list");
        assert_eq!(claims.sub, listed[0].id);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let service = make_service();
        service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");

        let wrong_password = service.login("alice@x.com", "nope").await.unwrap_err();
        let unknown_email = service.login("ghost@x.com", "secret").await.unwrap_err();
        assert!(matches!(wrong_password, Error::Unauthenticated));
        assert!(matches!(unknown_email, Error::Unauthenticated));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn get_user_rejects_malformed_id() {
        let service = make_service();
        let err = service.get_user("definitely-not-a-uuid").await.unwrap_err();
        assert!(matches!(err, Error::InvalidId));
    }

    #[tokio::test]
    async fn update_changes_only_patched_fields() {
        let service = make_service();
        let alice = service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");
        let updated = service
            .update_user(
                &alice.id.to_string(),
                UserPatch {
                    name: Some("Alicia".into()),
                    email: None,
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.email, "alice@x.com");
        assert_eq!(updated.created_at, alice.created_at);
    }

    #[tokio::test]
    async fn update_rejects_empty_patch() {
        let service = make_service();
        let alice = service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");
        let err = service
            .update_user(&alice.id.to_string(), UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let service = make_service();
        let alice = service
            .register("Alice", "alice@x.com", "secret")
            .await
            .expect("register");
        let id = alice.id.to_string();
        service.delete_user(&id).await.expect("delete");
        assert!(matches!(service.get_user(&id).await, Err(Error::NotFound)));
        assert!(matches!(service.delete_user(&id).await, Err(Error::NotFound)));
    }
}
