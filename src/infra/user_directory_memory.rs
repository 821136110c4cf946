use crate::domain_model::*;
use crate::domain_port::{UserDirectory, UserDirectoryError};
use crate::logger::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_password(&self, password: &str) -> Result<String, UserDirectoryError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| UserDirectoryError::Upstream(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, UserDirectoryError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| UserDirectoryError::Upstream(format!("invalid PHC hash: {e}")))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(UserDirectoryError::Upstream(format!("verify error: {e}"))),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

struct UserRecord {
    identity: UserIdentity,
    password_hash: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Process-local user directory, used by the `memory` backend and in tests.
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    hasher: Arc<Argon2PasswordHasher>,
}

impl InMemoryUserDirectory {
    pub fn new(hasher: Argon2PasswordHasher) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            hasher: Arc::new(hasher),
        }
    }

    // Argon2 is CPU bound, keep it off the async workers.
    async fn hash_off_runtime(&self, password: String) -> Result<String, UserDirectoryError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| UserDirectoryError::Upstream(format!("hash task: {e}")))?
    }

    async fn verify_off_runtime(
        &self,
        password: String,
        password_hash: String,
    ) -> Result<bool, UserDirectoryError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &password_hash))
            .await
            .map_err(|e| UserDirectoryError::Upstream(format!("verify task: {e}")))?
    }

    /// Registers a user with a known id. Existing entries for the same email are replaced.
    pub fn seed(&self, identity: UserIdentity, password: &str) -> Result<(), UserDirectoryError> {
        let password_hash = self.hasher.hash_password(password)?;
        let email = normalize_email(&identity.email);
        self.users.write().insert(
            email,
            UserRecord {
                identity,
                password_hash,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new(Argon2PasswordHasher::default())
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, UserDirectoryError> {
        let (identity, password_hash) = {
            let users = self.users.read();
            let rec = users
                .get(&normalize_email(email))
                .ok_or(UserDirectoryError::NotFound)?;
            (rec.identity.clone(), rec.password_hash.clone())
        };

        if !self
            .verify_off_runtime(password.to_string(), password_hash)
            .await?
        {
            return Err(UserDirectoryError::NotFound);
        }
        Ok(identity)
    }

    async fn create_user(&self, dto: CreateUserDto) -> Result<UserIdentity, UserDirectoryError> {
        let email = normalize_email(&dto.email);
        if email.is_empty() || !email.contains('@') {
            return Err(UserDirectoryError::InvalidInput("invalid email".to_string()));
        }
        if dto.password != dto.repeat_password {
            return Err(UserDirectoryError::InvalidInput(
                "passwords do not match".to_string(),
            ));
        }

        let password_hash = self.hash_off_runtime(dto.password).await?;
        let identity = UserIdentity {
            uuid: UserId(uuid::Uuid::new_v4().to_string()),
            email: email.clone(),
        };

        let mut users = self.users.write();
        if users.contains_key(&email) {
            return Err(UserDirectoryError::AlreadyExists);
        }
        users.insert(
            email,
            UserRecord {
                identity: identity.clone(),
                password_hash,
            },
        );
        debug!(user_id = %identity.uuid, "user created");
        Ok(identity)
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2PasswordHasher {
    Argon2PasswordHasher::new(Params::new(8, 1, 1, None).unwrap())
}
