//! Middleware for JWT token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use common::error::ApiError;
use tracing::debug;

use crate::{
    jwt::{Claims, JwtService},
    models::Role,
};

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            name: claims.name,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(jwt_service): State<JwtService>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let claims = jwt_service.validate_token(token).map_err(|e| {
        debug!("Failed to validate token: {}", e);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    // Add the user to request extensions for use in handlers
    req.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(req).await)
}

/// Attach the user when a valid token is present, continue anonymously otherwise
pub async fn optional_auth_middleware(
    State(jwt_service): State<JwtService>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| jwt_service.validate_token(token).ok());

    if let Some(claims) = claims {
        req.extensions_mut().insert(AuthUser::from(claims));
    }

    next.run(req).await
}

/// Allow only admins; must run after [`auth_middleware`]
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if !user.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}
