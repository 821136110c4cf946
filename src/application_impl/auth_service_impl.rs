use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{Cache, UserDirectory, UserDirectoryError};
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::DEFAULT_AUDIENCE;

#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub audience: String,
    pub access_ttl: Duration,
    /// `None` keeps refresh tokens until they are consumed or evicted.
    pub refresh_ttl: Option<Duration>,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        TokenPolicy {
            audience: DEFAULT_AUDIENCE.to_string(),
            access_ttl: Duration::from_secs(60 * 60),
            refresh_ttl: None,
        }
    }
}

pub struct RealAuthService {
    user_directory: Arc<dyn UserDirectory>,
    token_codec: Arc<dyn TokenCodec>,
    refresh_store: Arc<dyn Cache>,
    policy: TokenPolicy,
}

impl RealAuthService {
    pub fn new(
        user_directory: Arc<dyn UserDirectory>,
        token_codec: Arc<dyn TokenCodec>,
        refresh_store: Arc<dyn Cache>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            user_directory,
            token_codec,
            refresh_store,
            policy,
        }
    }

    fn validate_sign_up(request: &SignUpInput) -> Result<(), AuthError> {
        if request.email.trim().is_empty() {
            return Err(AuthError::Validation("email is required".to_string()));
        }
        if request.password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }
        if request.password != request.repeat_password {
            return Err(AuthError::Validation("passwords do not match".to_string()));
        }
        Ok(())
    }

    #[inline]
    fn new_refresh_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Mints an access token for `identity` and stores a fresh refresh id for it.
    pub fn issue_token_pair(&self, identity: &UserIdentity) -> Result<TokenPair, AuthError> {
        let access_ttl = chrono::Duration::from_std(self.policy.access_ttl)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        let claims = Claims::for_identity(identity, &self.policy.audience, Utc::now(), access_ttl)
            .ok_or_else(|| {
                AuthError::InternalError("access token expiry out of range".to_string())
            })?;
        let token = self.token_codec.sign(&claims)?;

        let refresh_token = Self::new_refresh_id();
        let payload =
            serde_json::to_vec(identity).map_err(|e| AuthError::InternalError(e.to_string()))?;
        self.refresh_store
            .set(refresh_token.as_bytes(), &payload, self.policy.refresh_ttl)?;

        debug!(user_id = %identity.uuid, "issued token pair");
        Ok(TokenPair {
            token,
            refresh_token,
        })
    }

    /// Consumes `refresh_token` and issues a replacement pair.
    ///
    /// The presented id is removed before anything else happens, so it stays
    /// spent even when minting the replacement fails.
    pub fn rotate_refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let payload = self.refresh_store.take(refresh_token.as_bytes())?;
        let identity: UserIdentity = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::InternalError(format!("stored identity: {e}")))?;

        let pair = self.issue_token_pair(&identity)?;
        info!(user_id = %identity.uuid, "refresh token rotated");
        Ok(pair)
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn sign_in(&self, request: SignInInput) -> Result<TokenPair, AuthError> {
        let SignInInput { email, password } = request;
        if email.trim().is_empty() || password.is_empty() {
            debug!("sign-in with missing credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let identity = self
            .user_directory
            .lookup_by_email_and_password(&email, &password)
            .await
            .map_err(|e| match e {
                UserDirectoryError::NotFound | UserDirectoryError::InvalidInput(_) => {
                    AuthError::InvalidCredentials
                }
                other => other.into(),
            })?;

        let pair = self.issue_token_pair(&identity)?;
        info!(user_id = %identity.uuid, "signed in");
        Ok(pair)
    }

    async fn sign_up(&self, request: SignUpInput) -> Result<TokenPair, AuthError> {
        Self::validate_sign_up(&request)?;
        let SignUpInput {
            email,
            password,
            repeat_password,
        } = request;

        let identity = self
            .user_directory
            .create_user(CreateUserDto {
                email,
                password,
                repeat_password,
            })
            .await?;

        let pair = self.issue_token_pair(&identity)?;
        info!(user_id = %identity.uuid, "signed up");
        Ok(pair)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.rotate_refresh_token(refresh_token)
    }
}
