use super::{UserId, UserIdentity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Claim set carried inside an access token.
///
/// Timestamps are whole seconds since the epoch, as JWT numeric dates are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    /// Returns `None` when `issued_at + ttl` is not representable.
    pub fn for_identity(
        identity: &UserIdentity,
        audience: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<Self> {
        let expires_at = issued_at.checked_add_signed(ttl)?;
        Some(Claims {
            sub: identity.uuid.clone(),
            aud: audience.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            email: Some(identity.email.clone()),
        })
    }

    /// `exp` is the first second at which the token is no longer accepted.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Wire form of a freshly minted credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity() -> UserIdentity {
        UserIdentity {
            uuid: UserId("u-42".to_string()),
            email: "a@b.com".to_string(),
        }
    }

    #[test]
    fn claims_for_identity_span_the_ttl() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let claims =
            Claims::for_identity(&identity(), "users", now, Duration::minutes(60)).unwrap();

        assert_eq!(claims.sub, UserId("u-42".to_string()));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn expiry_is_exclusive() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let claims =
            Claims::for_identity(&identity(), "users", now, Duration::seconds(10)).unwrap();

        assert!(!claims.is_expired_at(now + Duration::seconds(9)));
        assert!(claims.is_expired_at(now + Duration::seconds(10)));
    }

    #[test]
    fn unrepresentable_expiry_is_none() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(Claims::for_identity(&identity(), "users", now, Duration::MAX).is_none());
    }

    #[test]
    fn token_pair_serializes_with_gateway_field_names() {
        let pair = TokenPair {
            token: "a.b.c".to_string(),
            refresh_token: "r".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&pair).unwrap(),
            serde_json::json!({"token": "a.b.c", "refresh_token": "r"})
        );
    }
}
