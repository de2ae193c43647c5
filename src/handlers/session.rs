use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{LOGIN_PATH, ROOT_PATH, found};
use crate::render::{Message, render_login};
use crate::router::AppState;

pub const LOGIN_FAILED: &str = "Failed to log in.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /login -> login form, or straight to the report when the cookie is still valid.
pub async fn login_page(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    if state.authenticator.current(&jar).is_some() {
        return found(ROOT_PATH);
    }
    Html(render_login(&state.config.server.logo, &[])).into_response()
}

/// POST /login -> sets the session cookie on success, re-renders the form otherwise.
pub async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable login form");
            LoginForm::default()
        }
    };

    let identity = state.authenticator.validate(&form.username, &form.password);
    if identity.authenticated {
        info!(user = %identity.id, "login succeeded");
        let jar = state.authenticator.issue_cookie(jar, &identity);
        return (jar, found(ROOT_PATH)).into_response();
    }

    warn!(user = %form.username, "login failed");
    Html(render_login(
        &state.config.server.logo,
        &[Message::danger(LOGIN_FAILED)],
    ))
    .into_response()
}

/// GET|POST /logout
pub async fn logout(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let jar = state.authenticator.clear_cookie(jar);
    (jar, found(LOGIN_PATH)).into_response()
}
