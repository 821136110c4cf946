use crate::application_port::{TokenCodec, TokenError, Unverified};
use crate::domain_model::Claims;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

pub const DEFAULT_AUDIENCE: &str = "users";

#[derive(Clone)]
pub struct JwtConfig {
    pub audience: String,
    pub signing_key: Vec<u8>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("audience", &self.audience)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // exp is checked against Claims::is_expired_at so the boundary stays exclusive
        validation.validate_exp = false;
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        JwtHs256Codec { cfg, validation }
    }
}

impl TokenCodec for JwtHs256Codec {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.cfg.signing_key.is_empty() {
            return Err(TokenError::Signing("signing key is not configured".to_string()));
        }
        if claims.exp <= claims.iat {
            return Err(TokenError::Signing(format!(
                "expiry {} is not after issued-at {}",
                claims.exp, claims.iat
            )));
        }
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if self.cfg.signing_key.is_empty() {
            return Err(TokenError::Invalid);
        }
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &self.validation,
        )
        .map_err(|_| TokenError::Invalid)?;

        let claims = data.claims;
        if claims.is_expired_at(Utc::now()) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn peek(&self, token: &str) -> Result<Unverified<Claims>, TokenError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.insecure_disable_signature_validation();
        v.validate_exp = false;
        v.validate_aud = false;
        v.required_spec_claims.clear();
        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &v)
            .map_err(|_| TokenError::Invalid)?;
        Ok(Unverified::new(data.claims))
    }
}
