use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::context::AppContext;

/// Header carrying the signed-in identity, set by the sign-in proxy in front
/// of the service. Clients can forge it, so the listener must only be
/// reachable through that proxy.
pub const IDENTITY_HEADER: &str = "x-forwarded-email";

/// Identities allowed to use the service. An empty list admits nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    identities: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identities = identities
            .into_iter()
            .map(|identity| identity.as_ref().trim().to_lowercase())
            .filter(|identity| !identity.is_empty())
            .collect();
        Self { identities }
    }

    /// Parses the comma-separated `ALLOWED_USERS` form.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn permits(&self, identity: &str) -> bool {
        let identity = identity.trim().to_lowercase();
        !identity.is_empty() && self.identities.contains(&identity)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

pub async fn require_allowed(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let identity = request
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match identity {
        None => deny(StatusCode::UNAUTHORIZED, "Sign-in required"),
        Some(identity) if !ctx.allow_list.permits(&identity) => {
            tracing::warn!(%identity, "rejected identity not on allow-list");
            deny(StatusCode::FORBIDDEN, "Access denied")
        }
        Some(_) => next.run(request).await,
    }
}

fn deny(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}
