use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum UserDirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("user already exists")]
    AlreadyExists,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("user service error: {0}")]
    Upstream(String),
}

/// The user service as seen from the auth core.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve primary credentials to an identity.
    async fn lookup_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, UserDirectoryError>;

    async fn create_user(&self, dto: CreateUserDto) -> Result<UserIdentity, UserDirectoryError>;
}
