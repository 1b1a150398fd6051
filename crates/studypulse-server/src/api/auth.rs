use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use studypulse_core::model::{normalize_email, Role, User, UserProfile};
use studypulse_core::store::StorageError;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserProfile,
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let RegisterRequest {
        email,
        password,
        name,
        role,
    } = body.into_inner();
    let email = normalize_email(&email);
    let name = name.trim().to_string();

    if email.is_empty() || password.is_empty() || name.is_empty() {
        return Err(ApiError::Validation("All fields are required".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let users = &state.service.storage().users;
    if users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let role = match role.unwrap_or_default() {
        Role::Admin if state.server.allow_admin_signup => Role::Admin,
        Role::Admin => {
            warn!(%email, "admin self-registration disabled; creating student");
            Role::Student
        }
        Role::Student => Role::Student,
    };

    let password_hash = web::block(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))??;

    let user = User {
        id: Uuid::new_v4(),
        email,
        name,
        password_hash,
        role,
        created_at: Utc::now(),
    };
    match users.insert(&user).await {
        Ok(()) => {}
        Err(StorageError::Conflict) => {
            return Err(ApiError::Conflict("Email already registered".into()))
        }
        Err(e) => return Err(e.into()),
    }
    info!(user = %user.id, role = %user.role, "user registered");

    let token = state.jwt.issue(&user)?;
    Ok(HttpResponse::Created().json(AuthResponse {
        message: "User registered successfully",
        token,
        user: user.profile(),
    }))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let LoginRequest { email, password } = body.into_inner();
    let email = normalize_email(&email);
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }

    let invalid = || ApiError::Unauthorized("Invalid email or password".into());
    let user = state
        .service
        .storage()
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let matches = web::block(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;
    if !matches {
        return Err(invalid());
    }

    let token = state.jwt.issue(&user)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        message: "Login successful",
        token,
        user: user.profile(),
    }))
}

pub async fn me(state: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ApiError> {
    let user = match state.service.storage().users.get(caller.id).await {
        Ok(user) => user,
        Err(StorageError::NotFound) => {
            return Err(ApiError::Unauthorized("User not found".into()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Ok().json(json!({ "user": user.profile() })))
}
