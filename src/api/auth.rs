use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::validation;
use crate::config::AuthConfig;
use crate::db::{
    AuthResponse, LoginRequest, MeResponse, RegisterRequest, User, UserProfile, UserRole,
};
use crate::AppState;

/// Single message for both unknown-email and wrong-password failures, so a
/// caller cannot probe which addresses are registered.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Token claims carried by every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user id
    pub sub: String,
    /// Embedded role, checked by role gates without a database round trip
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Issue a signed bearer token for a user.
pub fn issue_token(auth: &AuthConfig, user_id: &str, role: UserRole) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + chrono::Duration::days(auth.token_ttl_days)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Internal server error")
    })
}

/// Decode and verify a bearer token. Expired, malformed, and bad-signature
/// tokens are rejected uniformly.
pub fn decode_token(auth: &AuthConfig, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::unauthorized("Not authorized to access this route"))
}

/// Reject tokens whose embedded role is not in the allowed set.
pub fn require_role(claims: &Claims, allowed: &[UserRole]) -> Result<(), ApiError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized for this action"))
    }
}

/// Register endpoint
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validation::validate_name(&request.first_name).map_err(ApiError::bad_request)?;
    validation::validate_name(&request.last_name).map_err(ApiError::bad_request)?;
    validation::validate_email(&request.email).map_err(ApiError::bad_request)?;
    validation::validate_password_pair(&request.password, &request.confirm_password)
        .map_err(ApiError::bad_request)?;

    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Internal server error")
    })?;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, first_name, last_name, email, password_hash, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(UserRole::Personal.to_string())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    tracing::info!("Registered user {}", request.email);

    let token = issue_token(&state.config.auth, &id, UserRole::Personal)?;
    let user = UserProfile {
        id,
        name: format!("{} {}", request.first_name, request.last_name),
        email: request.email,
        role: UserRole::Personal,
        subscription_plan: None,
    };

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let role = UserRole::from(user.role.clone());
    let token = issue_token(&state.config.auth, &user.id, role)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserProfile::from(user),
    }))
}

/// Current-user endpoint
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: user.0,
    })
}

/// Extractor for the authenticated user on privileged routes.
#[derive(Debug)]
pub struct AuthUser(pub UserProfile);

fn extract_bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts)
            .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;
        let claims = decode_token(&state.config.auth, token)?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&claims.sub)
            .fetch_optional(&state.db)
            .await?;

        user.map(|u| AuthUser(UserProfile::from(u)))
            .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;

    async fn test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.gemini.api_key = "test-key".to_string();
        let pool = db::init_memory().await;
        Arc::new(AppState::new(config, pool))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            password: "correct-horse-battery".to_string(),
            confirm_password: "correct-horse-battery".to_string(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("hunter2hunter2", "not-a-hash"));
    }

    #[test]
    fn test_token_carries_role() {
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 7,
        };
        let token = issue_token(&auth, "u1", UserRole::Organization).unwrap();
        let claims = decode_token(&auth, &token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, UserRole::Organization);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_on_wrong_secret() {
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 7,
        };
        let token = issue_token(&auth, "u1", UserRole::Personal).unwrap();

        let other = AuthConfig {
            jwt_secret: "different-secret".to_string(),
            token_ttl_days: 7,
        };
        let err = decode_token(&other, &token).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: -1,
        };
        let token = issue_token(&auth, "u1", UserRole::Personal).unwrap();
        assert!(decode_token(&auth, &token).is_err());
    }

    #[test]
    fn test_require_role() {
        let claims = Claims {
            sub: "u1".to_string(),
            role: UserRole::Personal,
            iat: 0,
            exp: 0,
        };
        assert!(require_role(&claims, &[UserRole::Personal, UserRole::Admin]).is_ok());
        let err = require_role(&claims, &[UserRole::Admin]).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = test_state().await;

        let (status, Json(registered)) = register(
            State(state.clone()),
            Json(register_request("jane@example.com")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered.user.role, UserRole::Personal);

        let Json(logged_in) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "jane@example.com".to_string(),
                password: "correct-horse-battery".to_string(),
            }),
        )
        .await
        .unwrap();

        // Token embeds the registered role
        let claims = decode_token(&state.config.auth, &logged_in.token).unwrap();
        assert_eq!(claims.role, UserRole::Personal);
        assert_eq!(claims.sub, registered.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let state = test_state().await;
        register(
            State(state.clone()),
            Json(register_request("jane@example.com")),
        )
        .await
        .unwrap();

        let err = register(State(state), Json(register_request("jane@example.com")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Email already registered");
    }

    #[tokio::test]
    async fn test_password_mismatch_rejected() {
        let state = test_state().await;
        let mut request = register_request("jane@example.com");
        request.confirm_password = "something-else-entirely".to_string();

        let err = register(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Passwords do not match");
    }

    #[tokio::test]
    async fn test_login_enumeration_resistance() {
        let state = test_state().await;
        register(
            State(state.clone()),
            Json(register_request("jane@example.com")),
        )
        .await
        .unwrap();

        let unknown_email = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "whatever-password".to_string(),
            }),
        )
        .await
        .unwrap_err();

        let wrong_password = login(
            State(state),
            Json(LoginRequest {
                email: "jane@example.com".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await
        .unwrap_err();

        // Identical status and message in both cases
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.message(), wrong_password.message());
    }

    #[tokio::test]
    async fn test_missing_or_non_bearer_header_rejected() {
        let state = test_state().await;

        let (mut no_header, _) = axum::http::Request::builder()
            .uri("/api/auth/me")
            .body(())
            .unwrap()
            .into_parts();
        let missing = AuthUser::from_request_parts(&mut no_header, &state)
            .await
            .unwrap_err();

        let (mut basic, _) = axum::http::Request::builder()
            .uri("/api/auth/me")
            .header("Authorization", "Basic amFuZTpodW50ZXIy")
            .body(())
            .unwrap()
            .into_parts();
        let non_bearer = AuthUser::from_request_parts(&mut basic, &state)
            .await
            .unwrap_err();

        let garbage_token = decode_token(&state.config.auth, "not-a-token").unwrap_err();

        // Same status and message whether the header is absent, uses another
        // scheme, or carries an undecodable token
        for err in [missing, non_bearer] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.message(), garbage_token.message());
        }
    }
}
