//! Bearer-token authentication for the demo identity.
//!
//! Tokens are HS256 JWTs assembled directly from the crypto stack: a base64url
//! header and claims body signed with HMAC-SHA256. The rest of the crate never
//! touches tokens; it consumes the owner string that [`authenticate`] returns.
//!
//! The single demo credential pair lives in configuration, not in code, so a
//! real user store can replace [`verify_login`] without touching ingestion or
//! query logic.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Owner identity (the login username).
    sub: String,
    /// Expiry, unix seconds.
    exp: i64,
}

/// Checks a login attempt against the configured demo credentials.
pub fn verify_login(auth: &AuthConfig, username: &str, password: &str) -> Result<()> {
    if username == auth.demo_username && password == auth.demo_password {
        Ok(())
    } else {
        Err(Error::Auth("incorrect username or password"))
    }
}

/// Issues a signed access token for `username` with the configured TTL.
pub fn issue_token(auth: &AuthConfig, username: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + auth.token_ttl_minutes * 60;
    sign_token(auth, username, exp)
}

fn sign_token(auth: &AuthConfig, username: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = Claims {
        sub: username.to_string(),
        exp,
    };
    // Claims are a two-field struct; serialization cannot fail.
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());

    let signing_input = format!("{}.{}", header, body);
    let mut mac =
        HmacSha256::new_from_slice(auth.secret_key.as_bytes()).expect("hmac accepts any key size");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{}.{}", signing_input, signature)
}

/// Validates `token` and returns the identity it was issued to.
///
/// Rejects malformed tokens, bad signatures, and expired claims, all as
/// [`Error::Auth`] with a short stable message.
pub fn authenticate(auth: &AuthConfig, token: &str) -> Result<String> {
    let mut parts = token.split('.');
    let (header, body, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(b), Some(s), None) => (h, b, s),
        _ => return Err(Error::Auth("could not validate credentials")),
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| Error::Auth("could not validate credentials"))?;

    let mut mac =
        HmacSha256::new_from_slice(auth.secret_key.as_bytes()).expect("hmac accepts any key size");
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| Error::Auth("could not validate credentials"))?;

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(body)
        .ok()
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .ok_or(Error::Auth("could not validate credentials"))?;

    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(Error::Auth("token has expired"));
    }

    Ok(claims.sub)
}

/// Pulls the bearer token out of an `Authorization` header value.
pub fn bearer_token(header_value: &str) -> Result<&str> {
    header_value
        .strip_prefix("Bearer ")
        .or_else(|| header_value.strip_prefix("bearer "))
        .ok_or(Error::Auth("not authenticated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth() -> AuthConfig {
        AuthConfig {
            secret_key: "test-secret".to_string(),
            token_ttl_minutes: 30,
            demo_username: "demo@example.com".to_string(),
            demo_password: "demo123".to_string(),
        }
    }

    #[test]
    fn token_round_trips_to_subject() {
        let auth = test_auth();
        let token = issue_token(&auth, "demo@example.com");
        let identity = authenticate(&auth, &token).unwrap();
        assert_eq!(identity, "demo@example.com");
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = test_auth();
        let expired = sign_token(&auth, "demo@example.com", chrono::Utc::now().timestamp() - 60);
        let err = authenticate(&auth, &expired).unwrap_err();
        assert!(matches!(err, Error::Auth("token has expired")));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let auth = test_auth();
        let token = issue_token(&auth, "demo@example.com");

        // Swap the claims body for one naming a different subject.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_body =
            URL_SAFE_NO_PAD.encode(br#"{"sub":"intruder@example.com","exp":9999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_body, parts[2]);

        assert!(authenticate(&auth, &forged).is_err());
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let auth = test_auth();
        let other = AuthConfig {
            secret_key: "different-secret".to_string(),
            ..test_auth()
        };
        let token = issue_token(&other, "demo@example.com");
        assert!(authenticate(&auth, &token).is_err());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let auth = test_auth();
        for bad in ["", "abc", "a.b", "a.b.c.d", "!!.!!.!!"] {
            assert!(authenticate(&auth, bad).is_err(), "token {:?}", bad);
        }
    }

    #[test]
    fn login_checks_configured_credentials() {
        let auth = test_auth();
        assert!(verify_login(&auth, "demo@example.com", "demo123").is_ok());
        assert!(verify_login(&auth, "demo@example.com", "wrong").is_err());
        assert!(verify_login(&auth, "other@example.com", "demo123").is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
        assert!(bearer_token("Basic abc").is_err());
        assert!(bearer_token("abc").is_err());
    }
}
