use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::errors::{AppError, Result};
use crate::models::user::Claims;
use crate::services::clock::Clock;

pub const TOKEN_TTL_HOURS: i64 = 24;

/// Issues and checks HS256 session tokens. Expiry is judged against the
/// injected clock rather than the wall clock.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(TOKEN_TTL_HOURS),
            clock,
        }
    }

    pub fn issue(&self, id: i64, username: &str) -> Result<String> {
        let now = self.clock.now();
        let claims = Claims {
            id,
            username: username.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("Token generation failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::unauthorized("Invalid token")
        })?;

        if data.claims.exp as i64 <= self.clock.now().timestamp() {
            return Err(AppError::unauthorized("Token expired"));
        }

        Ok(data.claims)
    }

    /// Verify the value of an `Authorization` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims> {
        let token = bearer(header)?;
        self.verify(token)
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer(header: Option<&str>) -> Result<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("No token provided"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use axum::http::StatusCode;

    fn service() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (TokenService::new("test-secret", clock.clone()), clock)
    }

    #[test]
    fn round_trips_claims_before_expiry() {
        let (tokens, clock) = service();
        let token = tokens.issue(7, "hod.physics").unwrap();

        clock.advance(Duration::hours(23));
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "hod.physics");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn rejects_after_expiry() {
        let (tokens, clock) = service();
        let token = tokens.issue(7, "hod.physics").unwrap();

        clock.advance(Duration::hours(24) + Duration::seconds(1));
        let err = tokens.verify(&token).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rejects_foreign_signature() {
        let (tokens, clock) = service();
        let other = TokenService::new("another-secret", clock);
        let token = other.issue(1, "intruder").unwrap();
        assert!(matches!(tokens.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn rejects_garbage_and_missing_prefix() {
        let (tokens, _) = service();
        assert!(tokens.verify("not.a.jwt").is_err());
        assert!(tokens.verify_header(None).is_err());
        assert!(tokens.verify_header(Some("Token abc")).is_err());
        assert!(tokens.verify_header(Some("Bearer ")).is_err());

        let token = tokens.issue(3, "office").unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(tokens.verify_header(Some(&header)).unwrap().id, 3);
    }
}
