//! # Accounts & Tokens
//!
//! Signup/login over the account store, argon2 password hashes, HS256 tokens, and
//! the extractors that turn an `Authorization` header into a caller.

use crate::handlers::{payment_error_to_response, ApiError};
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use pay_core::{BoxedAccountStore, NewUser, PaymentError, PaymentResult, PublicUser};
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Option<Regex> = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok();
    }
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

pub fn hash_password(plain: &str) -> PaymentResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PaymentError::Internal(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> PaymentResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PaymentError::Internal(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// HS256 signing and verification keys
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    /// Tokens never expire when unset
    ttl: Option<Duration>,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Option<Duration>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user: &PublicUser) -> PaymentResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now,
            exp: self.ttl.map(|ttl| now + ttl.as_secs() as i64),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| PaymentError::Internal(format!("jwt sign failed: {}", e)))?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> PaymentResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        if self.ttl.is_none() {
            validation.validate_exp = false;
            validation.required_spec_claims.clear();
        }

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    PaymentError::Unauthorized("Token expired".into())
                }
                _ => PaymentError::Unauthorized("Invalid token".into()),
            }
        })?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Returned by signup and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub user: PublicUser,
    pub token: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn hash_blocking(password: String) -> PaymentResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PaymentError::Internal(format!("hash task failed: {}", e)))?
}

async fn verify_blocking(password: String, hash: String) -> PaymentResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PaymentError::Internal(format!("verify task failed: {}", e)))?
}

pub struct AccountService {
    store: BoxedAccountStore,
    jwt: JwtKeys,
}

impl AccountService {
    pub fn new(store: BoxedAccountStore, jwt: JwtKeys) -> Self {
        Self { store, jwt }
    }

    #[instrument(skip(self, request))]
    pub async fn signup(&self, request: &SignupRequest) -> PaymentResult<AuthPayload> {
        let (Some(name), Some(email), Some(password)) = (
            present(&request.name),
            present(&request.email),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(PaymentError::InvalidInput(
                "Missing required fields: name, email, password".into(),
            ));
        };

        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(PaymentError::InvalidInput(
                "Please provide a valid email address".into(),
            ));
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PaymentError::InvalidInput(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(PaymentError::Conflict(
                "User with this email already exists".into(),
            ));
        }

        let password_hash = hash_blocking(password.to_string()).await?;
        let user: PublicUser = self
            .store
            .create_user(&NewUser {
                name: name.to_string(),
                email,
                password_hash,
            })
            .await?
            .into();

        let token = self.jwt.sign(&user)?;
        info!(user_id = %user.id, "User created");
        Ok(AuthPayload { user, token })
    }

    #[instrument(skip(self, request))]
    pub async fn login(&self, request: &LoginRequest) -> PaymentResult<AuthPayload> {
        let (Some(email), Some(password)) = (
            present(&request.email),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(PaymentError::InvalidInput(
                "Missing required fields: email, password".into(),
            ));
        };

        let Some(user) = self.store.find_user_by_email(&email.to_lowercase()).await? else {
            return Err(PaymentError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !verify_blocking(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "password mismatch");
            return Err(PaymentError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let user = PublicUser::from(user);
        let token = self.jwt.sign(&user)?;
        Ok(AuthPayload { user, token })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();

    (!token.is_empty()).then_some(token)
}

/// Caller identity if a valid token was supplied. A missing or bad token is
/// anonymous, never a rejection.
pub struct MaybeUser(pub Option<Claims>);

impl MaybeUser {
    pub fn is_admin(&self, state: &AppState) -> bool {
        self.0
            .as_ref()
            .is_some_and(|claims| state.config.is_admin(&claims.email))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts).and_then(|token| match state.jwt.verify(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "ignoring invalid token");
                None
            }
        });
        Ok(MaybeUser(claims))
    }
}

/// Authenticated caller on the admin allow-list
pub struct AdminUser(pub Claims);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::authorize(parts, state).map_err(payment_error_to_response)
    }
}

impl AdminUser {
    fn authorize(parts: &Parts, state: &AppState) -> PaymentResult<Self> {
        let token = bearer_token(parts).ok_or_else(|| {
            PaymentError::Unauthorized(
                "Unauthorized: Authorization header with JWT is required".into(),
            )
        })?;

        let claims = state.jwt.verify(token)?;
        if !state.config.is_admin(&claims.email) {
            warn!(email = %claims.email, "non-admin attempted an admin operation");
            return Err(PaymentError::Unauthorized("Admin access required".into()));
        }
        Ok(AdminUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::memory::MemoryStore;
    use std::sync::Arc;

    fn service(ttl: Option<Duration>) -> AccountService {
        AccountService::new(Arc::new(MemoryStore::new()), JwtKeys::new("test-secret", ttl))
    }

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("asha@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.in"));
        assert!(!is_valid_email("asha@example"));
        assert!(!is_valid_email("asha example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong-horse", &hash).unwrap());
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }

    #[test]
    fn test_token_without_ttl_has_no_exp() {
        let keys = JwtKeys::new("test-secret", None);
        let user = PublicUser {
            id: Uuid::new_v4(),
            name: "Mohit".into(),
            email: "mohit@example.com".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let claims = keys.verify(&keys.sign(&user).unwrap()).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, "mohit@example.com");
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_token_with_ttl_and_wrong_secret() {
        let keys = JwtKeys::new("test-secret", Some(Duration::from_secs(3600)));
        let user = PublicUser {
            id: Uuid::new_v4(),
            name: "Mohit".into(),
            email: "mohit@example.com".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let token = keys.sign(&user).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp, Some(claims.iat + 3600));

        let other = JwtKeys::new("other-secret", None);
        assert!(matches!(
            other.verify(&token),
            Err(PaymentError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let accounts = service(None);

        let created = accounts
            .signup(&signup("Mohit", "  Mohit@Example.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(created.user.email, "mohit@example.com");

        let login = accounts
            .login(&LoginRequest {
                email: Some("MOHIT@example.com".into()),
                password: Some("secret1".into()),
            })
            .await
            .unwrap();
        assert_eq!(login.user.id, created.user.id);
        assert!(!login.token.is_empty());
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let accounts = service(None);

        let err = accounts
            .signup(&SignupRequest {
                name: Some("Mohit".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: name, email, password");

        let err = accounts
            .signup(&signup("Mohit", "mohit@", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = accounts
            .signup(&signup("Mohit", "mohit@example.com", "12345"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters long");
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let accounts = service(None);
        accounts
            .signup(&signup("Mohit", "mohit@example.com", "secret1"))
            .await
            .unwrap();

        let err = accounts
            .signup(&signup("Other", "MOHIT@example.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_failures_share_message() {
        let accounts = service(None);
        accounts
            .signup(&signup("Mohit", "mohit@example.com", "secret1"))
            .await
            .unwrap();

        for (email, password) in [("mohit@example.com", "wrong!!"), ("nobody@example.com", "secret1")] {
            let err = accounts
                .login(&LoginRequest {
                    email: Some(email.into()),
                    password: Some(password.into()),
                })
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Invalid email or password");
            assert_eq!(err.status_code(), 401);
        }
    }
}
