use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the server-issued session credential.
pub const SESSION_COOKIE: &str = "session";

/// Validity window of a session cookie: 5 days.
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 5;

/// Claims decoded from an identity token or a session cookie.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Identity provider user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    /// Unix time of the interactive sign-in the credential descends from.
    #[serde(default)]
    pub auth_time: i64,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl IdentityClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Extracts the `Bearer` credential from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn session_lasts_five_days() {
        assert_eq!(SESSION_TTL_SECS, 432_000);
    }
}
