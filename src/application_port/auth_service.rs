use crate::domain_model::*;
use crate::domain_port::{CacheError, UserDirectoryError};

/// How a failure is surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("token invalid")]
    Invalid,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("refresh token not found")]
    RefreshTokenNotFound,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("signing error: {0}")]
    Signing(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("user service error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::UserExists | AuthError::Validation(_) => ErrorClass::BadRequest,
            AuthError::InvalidCredentials
            | AuthError::RefreshTokenNotFound
            | AuthError::TokenInvalid
            | AuthError::TokenExpired => ErrorClass::Unauthorized,
            AuthError::Signing(_)
            | AuthError::Store(_)
            | AuthError::Upstream(_)
            | AuthError::InternalError(_) => ErrorClass::Internal,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => AuthError::Signing(e),
            TokenError::Invalid => AuthError::TokenInvalid,
            TokenError::Expired => AuthError::TokenExpired,
        }
    }
}

impl From<CacheError> for AuthError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound => AuthError::RefreshTokenNotFound,
            e @ CacheError::EntryTooLarge { .. } => AuthError::Store(e.to_string()),
        }
    }
}

impl From<UserDirectoryError> for AuthError {
    fn from(err: UserDirectoryError) -> Self {
        match err {
            UserDirectoryError::NotFound => AuthError::InvalidCredentials,
            UserDirectoryError::AlreadyExists => AuthError::UserExists,
            UserDirectoryError::InvalidInput(e) => AuthError::Validation(e),
            UserDirectoryError::Upstream(e) => AuthError::Upstream(e),
        }
    }
}

/// Claims decoded without signature verification. Only good for diagnostics.
#[derive(Debug, Clone)]
pub struct Unverified<T>(T);

impl<T> Unverified<T> {
    pub fn new(inner: T) -> Self {
        Unverified(inner)
    }

    pub fn into_untrusted(self) -> T {
        self.0
    }
}

pub trait TokenCodec: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError>;
    /// Checks structure, signature, audience and expiry.
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
    fn peek(&self, token: &str) -> Result<Unverified<Claims>, TokenError>;
}

#[derive(Debug, Clone)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub repeat_password: String,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, request: SignInInput) -> Result<TokenPair, AuthError>;
    async fn sign_up(&self, request: SignUpInput) -> Result<TokenPair, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}
