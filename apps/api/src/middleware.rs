use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use patchgate_core::{Domain, User};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";
pub const DOMAIN_HEADER: &str = "x-domain";

/// Identity and scope every protected handler authorizes with.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub domain: Domain,
}

pub async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers();
    let user = header_value(headers, USER_HEADER)
        .map(User::new)
        .ok_or_else(|| ApiError::Unauthorized(format!("{USER_HEADER} header is required")))?;
    let domain = header_value(headers, DOMAIN_HEADER)
        .map(Domain::new)
        .unwrap_or(state.default_domain);

    request.extensions_mut().insert(Actor { user, domain });
    Ok(next.run(request).await)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
