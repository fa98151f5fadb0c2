use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{Role, TokenService};
use crate::error::ApiError;

/// Authenticated identity extracted from a verified token and attached to
/// the request for downstream handlers.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const ORGANIZERS: &[Role] = &[Role::Admin, Role::Organizer];
pub const MEMBERS: &[Role] = &[Role::Admin, Role::Volunteer, Role::Organizer];

/// Role guards, layered per-route with `middleware::from_fn_with_state`.
pub async fn require_admin(
    State(tokens): State<TokenService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&tokens, ADMIN_ONLY, &headers, request, next).await
}

pub async fn require_organizer(
    State(tokens): State<TokenService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&tokens, ORGANIZERS, &headers, request, next).await
}

pub async fn require_member(
    State(tokens): State<TokenService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&tokens, MEMBERS, &headers, request, next).await
}

/// The check order is load-bearing for deterministic status codes:
/// missing credential (401) -> malformed header (400) -> invalid or expired
/// token (400) -> role not allowed (403) -> success.
async fn authorize(
    tokens: &TokenService,
    allowed: &[Role],
    headers: &HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Access Denied. No token provided."))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::bad_request("Token format is incorrect."))?;

    let token = value
        .split_whitespace()
        .nth(1)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Access Denied. No token provided."))?;

    if !value.starts_with("Bearer ") {
        return Err(ApiError::bad_request("Token format is incorrect."));
    }

    // From<TokenError> maps expired and invalid tokens to distinct 400s.
    let claims = tokens.verify(token)?;

    if !allowed.contains(&claims.role) {
        return Err(ApiError::forbidden(
            "Access Denied. Insufficient Permissions",
        ));
    }

    request.extensions_mut().insert(AuthUser {
        id: claims.id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}
