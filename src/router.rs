use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::get,
};
use axum_extra::extract::cookie::Key;

use crate::config::Config;
use crate::db::Connector;
use crate::error::AppError;
use crate::handlers::{not_found, report, session};
use crate::middleware::{auth::require_identity, scope::request_scope};
use crate::render::ReportRenderer;
use crate::service::SessionAuthenticator;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub authenticator: SessionAuthenticator,
    pub renderer: ReportRenderer,
    pub connector: Arc<dyn Connector>,
    key: Key,
}

impl AppState {
    pub fn new(config: Config, connector: Arc<dyn Connector>) -> Result<Self, AppError> {
        config.validate()?;
        let key = config.cookie_key()?;
        let authenticator =
            SessionAuthenticator::new(config.credentials(), !config.server.insecure_cookie);
        let renderer = ReportRenderer::new(&config.server.logo);
        Ok(Self {
            config: Arc::new(config),
            authenticator,
            renderer,
            connector,
            key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(report::report).post(report::report))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ));

    Router::new()
        .route(
            "/login",
            get(session::login_page).post(session::login_submit),
        )
        .route("/logout", get(session::logout).post(session::logout))
        .merge(protected)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), request_scope))
        .with_state(state)
}
