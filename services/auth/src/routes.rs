//! Authentication service routes

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::{Duration, Utc};
use common::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    jwt::JwtService,
    mailer::Mailer,
    middleware::{AuthUser, auth_middleware},
    models::{NewUser, Role, UserResponse},
    password::{hash_password, verify_password},
    rate_limiter::{RateLimiterConfig, rate_limited},
    repositories::UserRepository,
    tokens::generate_token,
    validation::{normalize_email, validate_email, validate_name, validate_password},
};

/// State shared by the authentication handlers
#[derive(Clone)]
pub struct AuthState {
    pub user_repository: UserRepository,
    pub jwt_service: JwtService,
    pub mailer: Arc<dyn Mailer>,
    /// Stricter limit for login and registration
    pub rate_limit: RateLimiterConfig,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for registration and login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
    pub requires_verification: bool,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Create the router for the authentication endpoints
pub fn create_router(state: AuthState) -> anyhow::Result<Router> {
    let limited_routes = rate_limited(
        Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login)),
        state.rate_limit,
    )?;

    let protected_routes = Router::new()
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/change-password", put(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            auth_middleware,
        ));

    Ok(Router::new()
        .route("/auth/verify-email", get(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .merge(limited_routes)
        .merge(protected_routes)
        .with_state(state))
}

fn internal(context: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
    move |e| {
        error!("{}: {}", context, e);
        ApiError::Internal
    }
}

/// User registration endpoint
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(ApiError::Validation)?;
    validate_password(&payload.password).map_err(ApiError::Validation)?;
    validate_name(&payload.name).map_err(ApiError::Validation)?;

    if state
        .user_repository
        .email_exists(&email)
        .await
        .map_err(internal("Failed to check email"))?
    {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password).map_err(internal("Failed to hash password"))?;

    // Without SMTP there is no way to deliver a link, so accounts start verified
    let requires_verification = state.mailer.is_configured();
    let verification_token = requires_verification.then(generate_token);

    let user = state
        .user_repository
        .create(&NewUser {
            email,
            password_hash,
            name: payload.name.trim().to_string(),
            role: Role::Photographer,
            email_verified: !requires_verification,
            verification_expires: verification_token
                .as_ref()
                .map(|_| Utc::now() + Duration::hours(24)),
            verification_token: verification_token.clone(),
        })
        .await
        .map_err(internal("Failed to create user"))?;

    if let Some(token) = verification_token {
        if let Err(e) = state.mailer.send_verification(&user.email, &token).await {
            warn!("Failed to send verification email to {}: {}", user.email, e);
        }
    }

    let token = state
        .jwt_service
        .generate_token(&user)
        .map_err(internal("Failed to generate token"))?;

    info!("Registered user {}", user.id);

    let message = if requires_verification {
        "Registration successful, please check your email to verify your account"
    } else {
        "Registration successful"
    };

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: message.to_string(),
            token,
            user: UserResponse::from(&user),
            requires_verification,
        }),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());
    let email = normalize_email(&payload.email);

    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(internal("Failed to find user"))?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)
        .map_err(internal("Failed to verify password"))?
    {
        return Err(invalid());
    }

    let token = state
        .jwt_service
        .generate_token(&user)
        .map_err(internal("Failed to generate token"))?;

    info!("User {} logged in", user.id);

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        requires_verification: !user.email_verified,
        user: UserResponse::from(&user),
    }))
}

pub async fn verify_email(
    State(state): State<AuthState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("Verification token is required".to_string()))?;

    let verified = state
        .user_repository
        .verify_email(&token)
        .await
        .map_err(internal("Failed to verify email"))?;

    if !verified {
        return Err(ApiError::Validation(
            "Invalid or expired verification link".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Email verified successfully" })))
}

pub async fn resend_verification(
    State(state): State<AuthState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(ApiError::Validation)?;

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(internal("Failed to find user"))?;

    if let Some(user) = user.filter(|u| !u.email_verified) {
        let token = generate_token();
        state
            .user_repository
            .set_verification_token(user.id, &token, Utc::now() + Duration::hours(24))
            .await
            .map_err(internal("Failed to store verification token"))?;

        if let Err(e) = state.mailer.send_verification(&user.email, &token).await {
            warn!("Failed to send verification email to {}: {}", user.email, e);
        }
    }

    Ok(Json(json!({
        "message": "If the account exists and is not verified, a verification email has been sent"
    })))
}

pub async fn forgot_password(
    State(state): State<AuthState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(ApiError::Validation)?;

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(internal("Failed to find user"))?;

    if let Some(user) = user {
        let token = generate_token();
        state
            .user_repository
            .set_reset_token(user.id, &token, Utc::now() + Duration::hours(1))
            .await
            .map_err(internal("Failed to store reset token"))?;

        if let Err(e) = state.mailer.send_password_reset(&user.email, &token).await {
            warn!("Failed to send password reset email to {}: {}", user.email, e);
        }
    }

    Ok(Json(json!({
        "message": "If the account exists, a password reset email has been sent"
    })))
}

pub async fn reset_password(
    State(state): State<AuthState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.token.is_empty() {
        return Err(ApiError::Validation("Reset token is required".to_string()));
    }
    validate_password(&payload.new_password).map_err(ApiError::Validation)?;

    let password_hash =
        hash_password(&payload.new_password).map_err(internal("Failed to hash password"))?;

    let updated = state
        .user_repository
        .reset_password(&payload.token, &password_hash)
        .await
        .map_err(internal("Failed to reset password"))?;

    if !updated {
        return Err(ApiError::Validation(
            "Invalid or expired reset link".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Password has been reset" })))
}

pub async fn get_profile(
    State(state): State<AuthState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(internal("Failed to load profile"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "user": UserResponse::from(&user) })))
}

pub async fn update_profile(
    State(state): State<AuthState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_name(&payload.name).map_err(ApiError::Validation)?;

    let user = state
        .user_repository
        .update_name(auth_user.id, payload.name.trim())
        .await
        .map_err(internal("Failed to update profile"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "message": "Profile updated",
        "user": UserResponse::from(&user)
    })))
}

pub async fn change_password(
    State(state): State<AuthState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_password(&payload.new_password).map_err(ApiError::Validation)?;

    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(internal("Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &user.password_hash)
        .map_err(internal("Failed to verify password"))?
    {
        return Err(ApiError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash =
        hash_password(&payload.new_password).map_err(internal("Failed to hash password"))?;
    state
        .user_repository
        .update_password(user.id, &password_hash)
        .await
        .map_err(internal("Failed to update password"))?;

    Ok(Json(json!({ "message": "Password changed" })))
}
