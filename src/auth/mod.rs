/*!
 * Authentication and authorization.
 *
 * JWT bearer tokens carry the user's identity and role. Roles form a closed
 * two-value set: every request is matched exhaustively against it, so an
 * unknown role string in a token is rejected at validation time rather than
 * silently treated as unprivileged.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::user::{self, Entity as UserEntity};
use crate::events::{Event, EventSender};

/// The two access levels the system knows about. There is no third value and
/// no permission lattice behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(AuthError::UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from a validated JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub token_id: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            token_expiration,
        }
    }

    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_issuer: config.auth_issuer.clone(),
            jwt_audience: config.auth_audience.clone(),
            token_expiration: Duration::from_secs(config.jwt_expiration as u64),
        }
    }
}

/// Handles signup, login, token issuance and token validation.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        db: Arc<DatabaseConnection>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            config,
            db,
            event_sender,
        }
    }

    /// Registers a new account. The role is fixed at signup; a duplicate
    /// email is reported as a conflict without leaking the stored account.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: SignupRequest) -> Result<user::Model, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            email: Set(request.email.trim().to_lowercase()),
            role: Set(request.role.as_str().to_string()),
            password_hash: Set(password_hash),
            created_at: Set(now),
        };

        let saved = new_user.insert(&*self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AuthError::EmailTaken
            } else {
                AuthError::DatabaseError(e.to_string())
            }
        })?;

        info!(user_id = %saved.id, role = %saved.role, "user registered");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::UserRegistered {
                    user_id: saved.id,
                    role: saved.role.clone(),
                })
                .await
            {
                warn!("failed to publish user registered event: {}", e);
            }
        }

        Ok(saved)
    }

    /// Verifies credentials and issues an access token.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let found = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&request.password, &found.password_hash)?;

        self.generate_token(&found)
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::InternalError(format!("Stored hash is malformed: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Signup payload. The caller picks the role; there is no self-promotion
/// path after the account exists.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
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

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

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
            Self::InvalidToken | Self::UnknownRole(_) => (
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
            Self::EmailTaken => (
                StatusCode::CONFLICT,
                "AUTH_EMAIL_TAKEN",
                "Email is already registered".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "AUTH_INVALID_INPUT", msg.clone()),
            Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
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

/// Authentication middleware that extracts and validates bearer tokens.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

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

    match extract_auth_from_headers(&headers, &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AuthError::MissingAuth);
    }

    let token = auth_header.trim_start_matches("Bearer ").trim();
    let claims = auth_service.validate_token(token)?;

    let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    let role = claims.role.parse::<Role>()?;

    Ok(AuthUser {
        id,
        name: claims.name,
        email: claims.email,
        role,
        token_id: claims.jti,
    })
}

/// Role middleware. Matches exhaustively so a new role variant forces a
/// decision here at compile time.
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    let allowed = match required_role {
        Role::Admin => matches!(user.role, Role::Admin),
        Role::User => match user.role {
            Role::Admin | Role::User => true,
        },
    };

    if !allowed {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new()
        .route("/signup", axum::routing::post(signup_handler))
        .route("/login", axum::routing::post(login_handler))
        .layer(DefaultBodyLimit::max(1024 * 64)) // 64KB limit
}

/// Signup handler
pub async fn signup_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AuthError> {
    let created = auth_service.register(request).await?;
    let role = created.role.parse::<Role>()?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: created.id,
            name: created.name,
            email: created.email,
            role,
        }),
    ))
}

/// Login handler
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::InvalidInput(e.to_string()))?;
    let token = auth_service.login(request).await?;
    Ok(Json(token))
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        let config = AuthConfig::new(
            "test-secret-key-that-is-long-enough!".to_string(),
            "storeroom-api".to_string(),
            "storeroom-clients".to_string(),
            Duration::from_secs(3600),
        );
        let db = Arc::new(DatabaseConnection::Disconnected);
        AuthService::new(config, db, None)
    }

    fn sample_user(role: Role) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role: role.as_str().to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_round_trips_through_string() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!(matches!(
            "superuser".parse::<Role>(),
            Err(AuthError::UnknownRole(_))
        ));
    }

    #[test]
    fn generated_token_validates_and_carries_role() {
        let service = test_service();
        let user = sample_user(Role::Admin);

        let token = service.generate_token(&user).unwrap();
        let claims = service.validate_token(&token.access_token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.iss, "storeroom-api");
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let service = test_service();
        let user = sample_user(Role::User);
        let token = service.generate_token(&user).unwrap();

        let other = AuthService::new(
            AuthConfig::new(
                "a-different-secret-key-also-long-enough".to_string(),
                "storeroom-api".to_string(),
                "storeroom-clients".to_string(),
                Duration::from_secs(3600),
            ),
            Arc::new(DatabaseConnection::Disconnected),
            None,
        );

        assert!(other.validate_token(&token.access_token).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects_wrong_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
