use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::debug;

use crate::handlers::{LOGIN_PATH, found};
use crate::router::AppState;
use crate::service::Identity;

const FORM_LIMIT: usize = 64 * 1024;

/// Guard for protected routes.
/// Admits requests carrying a valid session cookie, or form fields with the right
/// username/password. Everyone else is sent to the login page with a 302.
pub async fn require_identity(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    req: Request,
    next: Next,
) -> Response {
    let (identity, mut req) = resolve_identity(&state, &jar, req).await;
    match identity {
        Some(identity) if identity.authenticated => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        _ => {
            debug!("anonymous request; redirecting to login");
            found(LOGIN_PATH)
        }
    }
}

async fn resolve_identity(
    state: &AppState,
    jar: &PrivateCookieJar,
    req: Request,
) -> (Option<Identity>, Request) {
    if let Some(identity) = state.authenticator.current(jar) {
        return (Some(identity), req);
    }
    if !is_form(req.headers()) {
        return (None, req);
    }

    // Read the form, then put the bytes back for the handler.
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, FORM_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "unreadable form body; treating request as anonymous");
            return (None, Request::from_parts(parts, Body::empty()));
        }
    };
    let fields: Vec<(String, String)> = url::form_urlencoded::parse(&bytes).into_owned().collect();
    let identity = state
        .authenticator
        .load_from_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    (identity, Request::from_parts(parts, Body::from(bytes)))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
        == Some(true)
}
