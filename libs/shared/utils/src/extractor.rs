use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Validates the bearer token and stores the resulting `User` in the request
/// extensions for handlers to pick up with `Extension<User>`.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Not authorized, no token".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.jwt_secret)
        .map_err(|e| AppError::Auth(format!("Not authorized, token failed: {}", e)))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Capability gate applied at the top of each handler, e.g.
/// `require_capability(&user, Role::can_book)`. Returns the caller's role
/// when the capability holds for it.
pub fn require_capability<F>(user: &User, capability: F) -> Result<Role, AppError>
where
    F: Fn(&Role) -> bool,
{
    match user.role() {
        Some(role) if capability(&role) => Ok(role),
        _ => {
            let shown = user.role.as_deref().unwrap_or("none");
            warn!("User {} with role '{}' rejected from route", user.id, shown);
            Err(AppError::Forbidden(format!(
                "User role '{}' is not authorized to access this route",
                shown
            )))
        }
    }
}
