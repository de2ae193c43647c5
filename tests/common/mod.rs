#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use base64::Engine;
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tower::ServiceExt;

use jspoc::config::Config;
use jspoc::db::{Connector, Report, ReportConnection};
use jspoc::types::ReportDate;
use jspoc::{AppError, AppState, app_router};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const KNOWN_DATE: &str = "20180316";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    RefuseConnection,
    FailQuery,
    /// Lookups never complete.
    StallQuery,
}

#[derive(Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl Counters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

/// In-memory stand-in for the report database.
pub struct MemoryConnector {
    mode: Mode,
    reports: Arc<HashMap<String, Value>>,
    counters: Arc<Counters>,
}

impl MemoryConnector {
    pub fn new(mode: Mode) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let mut reports = HashMap::new();
        reports.insert(
            KNOWN_DATE.to_string(),
            json!({"title": "Conjunction summary", "objects": 42}),
        );
        (
            Self {
                mode,
                reports: Arc::new(reports),
                counters: counters.clone(),
            },
            counters,
        )
    }
}

struct MemoryConnection {
    mode: Mode,
    reports: Arc<HashMap<String, Value>>,
    counters: Arc<Counters>,
}

impl Connector for MemoryConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn ReportConnection>, AppError>> {
        Box::pin(async move {
            if self.mode == Mode::RefuseConnection {
                return Err(AppError::ConnectionRefused);
            }
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemoryConnection {
                mode: self.mode,
                reports: self.reports.clone(),
                counters: self.counters.clone(),
            }) as Box<dyn ReportConnection>)
        })
    }
}

impl ReportConnection for MemoryConnection {
    fn find_report<'a>(
        &'a mut self,
        date: &'a ReportDate,
    ) -> BoxFuture<'a, Result<Option<Report>, AppError>> {
        Box::pin(async move {
            self.counters.lookups.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::FailQuery => return Err(AppError::ConnectionRefused),
                Mode::StallQuery => futures::future::pending::<()>().await,
                _ => {}
            }
            Ok(self
                .reports
                .get(&date.key())
                .map(|doc| Report::new(date, doc.clone())))
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        })
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.server.user = USER.to_string();
    cfg.server.pwd = PASSWORD.to_string();
    cfg.server.secret_key = base64::engine::general_purpose::STANDARD.encode([7u8; 64]);
    cfg.server.logo = "JSpOC".to_string();
    cfg.server.insecure_cookie = true;
    cfg
}

pub fn app(mode: Mode) -> (Router, Arc<Counters>) {
    let (connector, counters) = MemoryConnector::new(mode);
    let state = AppState::new(test_config(), Arc::new(connector)).expect("valid test config");
    (app_router(state), counters)
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn location(resp: &Response<Body>) -> Option<&str> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn set_cookies(resp: &Response<Body>) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Logs in with the configured pair and returns the `name=value` cookie to send back.
pub async fn login(app: &Router) -> String {
    let resp = send(
        app,
        form_post("/login", &format!("username={USER}&password={PASSWORD}")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let cookie = set_cookies(&resp)
        .into_iter()
        .find(|c| c.starts_with("remember_token="))
        .expect("login did not set the session cookie");
    cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

/// Background closes run on spawned tasks; give them a chance to finish.
pub async fn wait_for_closes(counters: &Counters, expected: usize) {
    for _ in 0..200 {
        if counters.closes() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}
