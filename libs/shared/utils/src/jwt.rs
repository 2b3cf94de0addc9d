use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, JwtHeader, User};

type HmacSha256 = Hmac<Sha256>;

/// Verify an HS256 token issued by the authentication service and turn its
/// claims into the request principal.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err("Invalid token format".to_string()),
    };

    let header: JwtHeader = decode_segment(header_b64, "header")?;
    if header.alg != "HS256" {
        debug!("Rejected token signed with {}", header.alg);
        return Err("Unsupported token algorithm".to_string());
    }

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims: JwtClaims = decode_segment(claims_b64, "claims")?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| format!("Invalid {} encoding", name))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        debug!("Failed to parse {}: {}", name, e);
        format!("Invalid {} format", name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_valid_token_yields_principal() {
        let patient = TestUser::patient("p@example.com");
        let token = JwtTestUtils::create_test_token(&patient, SECRET, Some(1));

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, patient.id);
        assert_eq!(user.role.as_deref(), Some("patient"));
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_rejects_expired_token() {
        let patient = TestUser::patient("p@example.com");
        let token = JwtTestUtils::create_expired_token(&patient, SECRET);
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Token expired");
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let patient = TestUser::patient("p@example.com");
        let token = JwtTestUtils::create_invalid_signature_token(&patient);
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Invalid token signature");
    }

    #[test]
    fn test_rejects_malformed_and_unconfigured() {
        assert!(validate_token("only.two", SECRET).is_err());
        assert!(validate_token(&JwtTestUtils::create_malformed_token(), SECRET).is_err());
        assert_eq!(
            validate_token("a.b.c", "").unwrap_err(),
            "JWT secret is not set"
        );
    }
}
