//! Token payload model (transport-agnostic).

use serde::{Deserialize, Serialize};

use aegis_core::UserId;

/// Discriminates access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every issued token.
///
/// `uid`, `sub`, and `type` are required on the wire; a payload missing any of
/// them fails decoding and therefore verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (user id).
    pub uid: UserId,

    /// Subject name (username).
    pub sub: String,

    /// Token purpose.
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Grant scopes baked into the token.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Expiry as epoch seconds. Overwritten at issuance.
    #[serde(default)]
    pub exp: i64,
}

impl Claims {
    pub fn new(uid: UserId, sub: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            uid,
            sub: sub.into(),
            kind,
            scopes: Vec::new(),
            exp: 0,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TokenKind::Refresh).unwrap();
        assert_eq!(json, "\"refresh\"");
    }

    #[test]
    fn claims_payload_uses_wire_field_names() {
        let claims = Claims::new(UserId::new(), "alice", TokenKind::Access);
        let value = serde_json::to_value(&claims).unwrap();

        assert!(value.get("uid").is_some());
        assert_eq!(value["sub"], "alice");
        assert_eq!(value["type"], "access");
        assert!(value["scopes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn payload_without_type_claim_is_rejected() {
        let raw = serde_json::json!({
            "uid": uuid::Uuid::now_v7(),
            "sub": "alice",
            "exp": 0,
        });
        assert!(serde_json::from_value::<Claims>(raw).is_err());
    }
}
