use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the user service.
///
/// The user service owns the format, so it is kept as an opaque string.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user id must not be empty")]
pub struct EmptyUserId;

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = EmptyUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmptyUserId);
        }
        Ok(UserId(s.to_string()))
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The identity record the user service hands back after a successful
/// lookup or creation. This is what gets stored behind a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uuid: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserDto {
    pub email: String,
    pub password: String,
    pub repeat_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims_user_id() {
        let id: UserId = "  6123abc  ".parse().unwrap();
        assert_eq!(id.as_str(), "6123abc");
        assert!("   ".parse::<UserId>().is_err());
    }

    #[test]
    fn identity_uses_user_service_field_names() {
        let identity = UserIdentity {
            uuid: UserId("u-1".to_string()),
            email: "a@b.com".to_string(),
        };
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json, serde_json::json!({"uuid": "u-1", "email": "a@b.com"}));

        let back: UserIdentity = serde_json::from_value(json).unwrap();
        assert_eq!(back, identity);
    }
}
