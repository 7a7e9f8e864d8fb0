/// Signed session tokens
///
/// After a successful identity-provider sign-in the server issues a session
/// token carrying the user's email (stable identity key) and display name.
/// Nothing is persisted: every request re-establishes the session by
/// validating the token.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: 30 days
/// - **Validation**: signature, expiration, not-before and issuer
/// - **Secret**: at least 32 bytes, enforced by the server configuration
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::session::{issue_session_token, validate_token, SessionUser};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes!";
/// let user = SessionUser::new("ana@example.com", "Ana");
///
/// let token = issue_session_token(&user, secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.user(), user);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Issuer claim of every session token
pub const SESSION_ISSUER: &str = "taskboard";

/// Session lifetime in days
pub const SESSION_LIFETIME_DAYS: i64 = 30;

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// Signed-in user as seen by the pages
///
/// `email` is the identity key that tasks and comments are scoped by;
/// `name` is only a display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct SessionUser {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub name: String,
}

impl SessionUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Session token claims
///
/// # Standard Claims
///
/// - `sub`: user email
/// - `iss`: always "taskboard"
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Custom Claims
///
/// - `name`: display name captured at sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - user email
    pub sub: String,

    /// Display name
    pub name: String,

    /// Issuer - always "taskboard"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl SessionClaims {
    /// Claims with the default 30 day lifetime
    pub fn new(user: &SessionUser) -> Self {
        Self::with_expiration(user, Duration::days(SESSION_LIFETIME_DAYS))
    }

    /// Claims with a custom lifetime
    pub fn with_expiration(user: &SessionUser, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user.email.clone(),
            name: user.name.clone(),
            iss: SESSION_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// The user this session belongs to
    pub fn user(&self) -> SessionUser {
        SessionUser::new(self.sub.clone(), self.name.clone())
    }

    /// Checks if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Seconds until expiry, for the cookie `Max-Age`
    pub fn max_age_seconds(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Signs claims into a token
///
/// # Errors
///
/// Returns `SessionError::CreateError` if encoding fails.
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| SessionError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a session token for a signed-in user
pub fn issue_session_token(user: &SessionUser, secret: &str) -> Result<String, SessionError> {
    create_token(&SessionClaims::new(user), secret)
}

/// Validates a session token and extracts its claims
///
/// # Errors
///
/// Returns an error if the signature is invalid, the token has expired,
/// the issuer is not "taskboard", or the token is malformed.
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => SessionError::InvalidIssuer {
                expected: SESSION_ISSUER.to_string(),
            },
            _ => SessionError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn ana() -> SessionUser {
        SessionUser::new("ana@example.com", "Ana")
    }

    #[test]
    fn test_claims_new() {
        let claims = SessionClaims::new(&ana());

        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.name, "Ana");
        assert_eq!(claims.iss, "taskboard");
        assert!(!claims.is_expired());

        let lifetime = claims.exp - claims.iat;
        assert_eq!(lifetime, 30 * 24 * 3600);
    }

    #[test]
    fn test_issue_and_validate() {
        let token = issue_session_token(&ana(), SECRET).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.user(), ana());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_session_token(&ana(), SECRET).unwrap();
        let result = validate_token(&token, "another-secret-key-at-least-32-bytes");

        assert!(matches!(result, Err(SessionError::ValidationError(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = SessionClaims::with_expiration(&ana(), Duration::seconds(-120));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(SessionError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = SessionClaims::new(&ana());
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            validate_token(&token, SECRET),
            Err(SessionError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validate_token("not.a.token", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_session_user_validation() {
        assert!(ana().validate().is_ok());
        assert!(SessionUser::new("not-an-email", "Ana").validate().is_err());
        assert!(SessionUser::new("ana@example.com", "").validate().is_err());
    }
}
