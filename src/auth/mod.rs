/*!
 * # Authentication and Authorization Module
 *
 * JWT-based authentication for the CondoStock API. Residents log in with
 * their CPF and password; tokens carry the system role (admin/resident) and
 * the household role (owner/member) so handlers can gate admin-only and
 * owner-only operations.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::resident::{self, Entity as ResidentEntity};
use crate::models::Role;

const TOKEN_ISSUER: &str = "condostock-api";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,       // Subject (resident ID)
    pub cpf: String,       // Login identifier
    pub name: String,      // Display name
    pub role: String,      // ADMIN or RESIDENT
    pub unit_role: String, // OWNER or MEMBER
    pub jti: String,       // JWT ID
    pub iat: i64,          // Issued at time
    pub exp: i64,          // Expiration time
    pub iss: String,       // Issuer
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub resident_id: Uuid,
    pub cpf: String,
    pub name: String,
    pub role: String,
    pub unit_role: String,
    pub token_id: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.to_string()
    }
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_expiration,
        }
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Verify CPF and password against the residents table.
    pub async fn authenticate(
        &self,
        cpf: &str,
        password: &str,
    ) -> Result<resident::Model, AuthError> {
        let resident = ResidentEntity::find()
            .filter(resident::Column::Cpf.eq(cpf))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &resident.password_hash)? {
            debug!(cpf = %cpf, "Password verification failed");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(resident)
    }

    /// Generate a JWT token for a resident
    pub fn generate_token(&self, resident: &resident::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + chrono::Duration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: resident.id.to_string(),
            cpf: resident.cpf.clone(),
            name: resident.name.clone(),
            role: resident.role.clone(),
            unit_role: resident.unit_role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(token_data.claims)
    }

    /// Replace a resident's password and clear the first-login flag.
    pub async fn change_password(
        &self,
        resident_id: Uuid,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let resident = ResidentEntity::find_by_id(resident_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        let mut active: resident::ActiveModel = resident.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.is_first_login = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        active
            .update(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

/// Hash a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {e}")))
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::InternalError(format!("Stored hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal authentication error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    let token = match token {
        Some(token) => token,
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service.validate_token(token) {
        Ok(claims) => {
            let resident_id = match Uuid::parse_str(&claims.sub) {
                Ok(id) => id,
                Err(_) => return AuthError::InvalidToken.into_response(),
            };
            request.extensions_mut().insert(AuthUser {
                resident_id,
                cpf: claims.cpf,
                name: claims.name,
                role: claims.role,
                unit_role: claims.unit_role,
                token_id: claims.jti,
            });
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Middleware for admin-only routes; must run after `auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if !user.is_admin() {
        warn!(resident_id = %user.resident_id, "Admin-only route denied");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Login request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 11, max = 14, message = "CPF must have 11 digits"))]
    pub cpf: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response: the token plus the profile the front-end keeps locally.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginUser {
    pub id: Uuid,
    pub name: String,
    pub cpf: String,
    pub role: String,
    pub unit_role: String,
    pub status: String,
    pub apartment: String,
    pub block: String,
    pub is_first_login: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 6, message = "Password must have at least 6 characters"))]
    pub new_password: String,
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new()
        .route("/login", axum::routing::post(login_handler))
        .route(
            "/change-password",
            axum::routing::post(change_password_handler)
                .layer(axum::middleware::from_fn(auth_middleware)),
        )
}

/// Login endpoint handler
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    payload
        .validate()
        .map_err(|_| AuthError::InvalidCredentials)?;

    let cleaned_cpf: String = payload.cpf.chars().filter(char::is_ascii_digit).collect();
    let resident = auth_service
        .authenticate(&cleaned_cpf, &payload.password)
        .await?;
    let access_token = auth_service.generate_token(&resident)?;

    Ok(Json(LoginResponse {
        access_token,
        user: LoginUser {
            id: resident.id,
            name: resident.name,
            cpf: resident.cpf,
            role: resident.role,
            unit_role: resident.unit_role,
            status: resident.status,
            apartment: resident.apartment,
            block: resident.block,
            is_first_login: resident.is_first_login,
        },
    }))
}

/// Change-password endpoint handler (authenticated)
pub async fn change_password_handler(
    State(auth_service): State<Arc<AuthService>>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AuthError> {
    payload
        .validate()
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

    auth_service
        .change_password(user.resident_id, &payload.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig::new(
                "unit_test_secret_key_with_sufficient_length_42".to_string(),
                Duration::from_secs(3600),
            ),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn sample_resident() -> resident::Model {
        resident::Model {
            id: Uuid::new_v4(),
            cpf: "12345678901".into(),
            name: "Maria".into(),
            email: None,
            phone: None,
            password_hash: String::new(),
            role: "ADMIN".into(),
            unit_role: "OWNER".into(),
            status: "ACTIVE".into(),
            apartment: "101".into(),
            block: "A".into(),
            owner_id: None,
            is_first_login: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let svc = service();
        let resident = sample_resident();

        let token = svc.generate_token(&resident).unwrap();
        let claims = svc.validate_token(&token).unwrap();

        assert_eq!(claims.sub, resident.id.to_string());
        assert_eq!(claims.cpf, resident.cpf);
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.unit_role, "OWNER");
        assert_eq!(claims.iss, TOKEN_ISSUER);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let svc = service();
        let other = AuthService::new(
            AuthConfig::new(
                "a_completely_different_secret_key_of_len_42!!".to_string(),
                Duration::from_secs(3600),
            ),
            Arc::new(DatabaseConnection::Disconnected),
        );

        let token = other.generate_token(&sample_resident()).unwrap();
        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
