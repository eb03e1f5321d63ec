//! Authentication module for the Movie Catalog API
//!
//! This module provides authentication functionality including:
//! - Password hashing with bcrypt
//! - JWT session token generation and verification
//! - HTTP-only cookie support for session storage
//! - `Auth` / `AdminAuth` extractors for protected routes

use std::fmt;
use std::future::{ready, Ready};

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;
use crate::models::{Role, User};

/// bcrypt cost factor
const BCRYPT_COST: u32 = 10;

/// JWT token expiry duration in days
const JWT_EXPIRY_DAYS: i64 = 7;

/// Cookie name for the session token
pub const AUTH_COOKIE_NAME: &str = "uid";

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Token generation failed: {0}")]
    TokenGenerationError(String),

    #[error("Token verification failed: {0}")]
    TokenVerificationError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Missing session token")]
    MissingToken,

    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,

    #[error("Insufficient role")]
    InsufficientRole,
}

/// A plaintext password on its way to storage
///
/// Only this type can be hashed, so a stored hash is never hashed again.
#[derive(Clone)]
pub struct PlainPassword(String);

impl PlainPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive the bcrypt hash to persist
    pub fn hash(&self) -> Result<String, AuthError> {
        hash_password(&self.0)
    }

    /// Check this password against a stored hash
    pub fn matches(&self, hash: &str) -> Result<bool, AuthError> {
        verify_password(&self.0, hash)
    }
}

impl fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlainPassword(***)")
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (hex user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Hash a password using bcrypt
///
/// # Arguments
/// * `password` - The plain text password to hash
///
/// # Returns
/// * `Ok(String)` - The hashed password
/// * `Err(AuthError)` - If hashing fails
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::HashingError(e.to_string()))
}

/// Verify a password against a bcrypt hash
///
/// # Returns
/// * `Ok(true)` - If the password matches
/// * `Ok(false)` - If the password doesn't match
/// * `Err(AuthError)` - If verification fails
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::HashingError(e.to_string()))
}

/// Generate a session token for a user
///
/// # Arguments
/// * `user` - The user the token identifies
/// * `secret` - The JWT secret key for signing
pub fn generate_token(user: &User, secret: &str) -> Result<String, AuthError> {
    let now = Utc::now();
    let expiry = now + Duration::days(JWT_EXPIRY_DAYS);

    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
        exp: expiry.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
}

/// Verify and decode a session token
///
/// # Returns
/// * `Ok(Claims)` - The decoded claims if valid
/// * `Err(AuthError)` - If verification fails or token is expired
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data: TokenData<Claims> = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenVerificationError(e.to_string()),
    })?;

    Ok(token_data.claims)
}

// ============================================================================
// HTTP-Only Cookie Management
// ============================================================================

/// Create an HTTP-only cookie containing the session token
///
/// # Returns
/// A Cookie configured with:
/// - HttpOnly: true (prevents JavaScript access)
/// - Secure: as configured (only sent over HTTPS when set)
/// - SameSite: Lax
/// - Path: "/"
/// - Max-Age: 7 days (matches token expiry)
pub fn create_auth_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE_NAME, token.to_owned())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(JWT_EXPIRY_DAYS))
        .finish()
}

/// Create a cookie that clears the session token (for logout and account deletion)
pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::ZERO)
        .finish()
}

/// Extract the session token from the `uid` cookie
pub fn extract_token_from_cookie(req: &HttpRequest) -> Option<String> {
    req.cookie(AUTH_COOKIE_NAME).map(|c| c.value().to_owned())
}

/// Extract a token from an Authorization header value
///
/// # Returns
/// * `Ok(&str)` - The extracted token
/// * `Err(AuthError)` - If the header is not `Bearer <token>`
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AuthError> {
    if !auth_header.starts_with("Bearer ") {
        return Err(AuthError::InvalidAuthHeaderFormat);
    }

    let token = auth_header.trim_start_matches("Bearer ").trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeaderFormat);
    }

    Ok(token)
}

/// Validate an HTTP request and extract the session claims
///
/// This function checks for a token in the following order:
/// 1. Authorization header (Bearer token)
/// 2. HTTP-only cookie (`uid`)
pub fn validate_http_request(req: &HttpRequest, secret: &str) -> Result<Claims, AuthError> {
    let token = if let Some(auth_header) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        extract_token_from_header(auth_header)?.to_owned()
    } else if let Some(cookie_token) = extract_token_from_cookie(req) {
        cookie_token
    } else {
        return Err(AuthError::MissingToken);
    };

    verify_token(&token, secret)
}

/// Configuration for the auth extractors
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key
    pub jwt_secret: String,
    /// Whether session cookies carry the `Secure` flag
    pub cookie_secure: bool,
}

/// Authenticated user extractor for Actix-web routes
///
/// # Example
/// ```ignore
/// async fn protected_route(user: Auth) -> impl Responder {
///     HttpResponse::Ok().json(format!("Hello, {}", user.username))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Auth {
    /// The authenticated user's hex ID
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for Auth {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<Auth, AppError> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| AppError::internal("Auth configuration not found"))?;

    Ok(validate_http_request(req, &config.jwt_secret)?.into())
}

impl FromRequest for Auth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Extractor for routes restricted to the `admin` role
#[derive(Debug, Clone)]
pub struct AdminAuth(pub Auth);

impl FromRequest for AdminAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let result = authenticate(req).and_then(|auth| match auth.role {
            Role::Admin => Ok(AdminAuth(auth)),
            Role::User => Err(AuthError::InsufficientRole.into()),
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn sample_user(role: Role) -> User {
        User {
            id: "65f1c0a2b3d4e5f601234568".to_string(),
            username: "cinephile".to_string(),
            email: "cinephile@example.com".to_string(),
            password: String::new(),
            role,
            profile_photo: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn auth_config() -> web::Data<AuthConfig> {
        web::Data::new(AuthConfig {
            jwt_secret: "test_secret".to_string(),
            cookie_secure: false,
        })
    }

    #[test]
    fn test_hash_password_creates_valid_hash() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(!hash.is_empty());
        assert!(hash.starts_with("$2"));
        assert_ne!(hash, password);
    }

    #[test]
    fn test_hash_password_different_hashes_for_same_password() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        // Due to salt, hashes should be different
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_plain_password_matches_its_hash() {
        let password = PlainPassword::new("пароль_密码_🔐");
        let hash = password.hash().unwrap();

        assert!(password.matches(&hash).unwrap());
        assert!(!PlainPassword::new("other").matches(&hash).unwrap());
        assert_eq!(password.len(), 12);
    }

    #[test]
    fn test_plain_password_debug_is_redacted() {
        let password = PlainPassword::new("hunter2hunter2");
        assert_eq!(format!("{:?}", password), "PlainPassword(***)");
    }

    #[test]
    fn test_verify_token_valid_token() {
        let user = sample_user(Role::Admin);
        let token = generate_token(&user, "test_secret_key").unwrap();
        let claims = verify_token(&token, "test_secret_key").unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "cinephile");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let token = generate_token(&sample_user(Role::User), "correct_secret").unwrap();
        assert!(verify_token(&token, "wrong_secret").is_err());
    }

    #[test]
    fn test_verify_token_invalid_token() {
        assert!(verify_token("invalid.token.here", "test_secret").is_err());
    }

    #[test]
    fn test_token_expiry_is_seven_days() {
        let token = generate_token(&sample_user(Role::User), "test_secret").unwrap();
        let claims = verify_token(&token, "test_secret").unwrap();

        let expected_expiry = claims.iat + (7 * 24 * 60 * 60);
        assert!((claims.exp - expected_expiry).abs() < 60);
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(extract_token_from_header("Bearer   token123  ").unwrap(), "token123");
        assert!(matches!(
            extract_token_from_header("bearer token123"),
            Err(AuthError::InvalidAuthHeaderFormat)
        ));
        assert!(matches!(
            extract_token_from_header("Bearer "),
            Err(AuthError::InvalidAuthHeaderFormat)
        ));
    }

    // ========================================================================
    // HTTP-Only Cookie Tests
    // ========================================================================

    #[test]
    fn test_create_auth_cookie_properties() {
        let cookie = create_auth_cookie("test_jwt_token_123", true);

        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.value(), "test_jwt_token_123");
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.http_only().unwrap_or(false));
        assert!(cookie.secure().unwrap_or(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_create_logout_cookie_clears_value() {
        let cookie = create_logout_cookie(false);

        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }

    // ========================================================================
    // Extractor Tests
    // ========================================================================

    #[actix_rt::test]
    async fn test_auth_extractor_reads_cookie() {
        let token = generate_token(&sample_user(Role::User), "test_secret").unwrap();
        let req = TestRequest::default()
            .app_data(auth_config())
            .cookie(Cookie::new(AUTH_COOKIE_NAME, token))
            .to_http_request();

        let auth = Auth::extract(&req).await.unwrap();
        assert_eq!(auth.user_id, "65f1c0a2b3d4e5f601234568");
        assert_eq!(auth.role, Role::User);
    }

    #[actix_rt::test]
    async fn test_auth_extractor_rejects_missing_token() {
        let req = TestRequest::default()
            .app_data(auth_config())
            .to_http_request();

        let result = Auth::extract(&req).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::MissingToken))));
    }

    #[actix_rt::test]
    async fn test_admin_extractor_rejects_regular_user() {
        let token = generate_token(&sample_user(Role::User), "test_secret").unwrap();
        let req = TestRequest::default()
            .app_data(auth_config())
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();

        let result = AdminAuth::extract(&req).await;
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::InsufficientRole))
        ));
    }

    #[actix_rt::test]
    async fn test_admin_extractor_accepts_admin() {
        let token = generate_token(&sample_user(Role::Admin), "test_secret").unwrap();
        let req = TestRequest::default()
            .app_data(auth_config())
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();

        let AdminAuth(auth) = AdminAuth::extract(&req).await.unwrap();
        assert_eq!(auth.username, "cinephile");
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(AuthError::TokenExpired.to_string(), "Token expired");
        assert_eq!(AuthError::MissingToken.to_string(), "Missing session token");
    }
}
