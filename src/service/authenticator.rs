use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use subtle::ConstantTimeEq;
use time::Duration;

use crate::config::Credentials;

pub const SESSION_COOKIE: &str = "remember_token";
const SESSION_DAYS: i64 = 365;

/// Who is making the request. Never stored server side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub authenticated: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            id: String::new(),
            authenticated: false,
        }
    }

    fn authenticated(id: &str) -> Self {
        Self {
            id: id.to_string(),
            authenticated: true,
        }
    }
}

/// Checks requests against the single configured credential pair.
#[derive(Clone)]
pub struct SessionAuthenticator {
    credentials: Arc<Credentials>,
    secure_cookie: bool,
}

impl SessionAuthenticator {
    pub fn new(credentials: Credentials, secure_cookie: bool) -> Self {
        Self {
            credentials: Arc::new(credentials),
            secure_cookie,
        }
    }

    /// Exact, case-sensitive match on both fields.
    pub fn validate(&self, username: &str, password: &str) -> Identity {
        if self.username_matches(username) && self.password_matches(password) {
            Identity::authenticated(username)
        } else {
            Identity::anonymous()
        }
    }

    /// Restore an identity from the decrypted session cookie value.
    pub fn load_from_cookie(&self, token: &str) -> Option<Identity> {
        self.username_matches(token)
            .then(|| Identity::authenticated(token))
    }

    /// Credentials posted alongside a request, for clients that do not keep cookies.
    /// A known username with a wrong password yields an unauthenticated identity.
    pub fn load_from_form<'a, I>(&self, fields: I) -> Option<Identity>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut username = None;
        let mut password = None;
        for (k, v) in fields {
            match k {
                "username" if username.is_none() => username = Some(v),
                "password" if password.is_none() => password = Some(v),
                _ => {}
            }
        }

        let username = username?;
        if !self.username_matches(username) {
            return None;
        }
        let password = password?;
        Some(Identity {
            id: username.to_string(),
            authenticated: self.password_matches(password.trim()),
        })
    }

    /// Identity from the session cookie, if any.
    pub fn current(&self, jar: &PrivateCookieJar) -> Option<Identity> {
        jar.get(SESSION_COOKIE)
            .and_then(|c| self.load_from_cookie(c.value()))
    }

    pub fn issue_cookie(&self, jar: PrivateCookieJar, identity: &Identity) -> PrivateCookieJar {
        jar.add(
            Cookie::build(Cookie::new(SESSION_COOKIE, identity.id.clone()))
                .path("/")
                .http_only(true)
                .secure(self.secure_cookie)
                .same_site(SameSite::Lax)
                .max_age(Duration::days(SESSION_DAYS))
                .build(),
        )
    }

    pub fn clear_cookie(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(
            Cookie::build(Cookie::new(SESSION_COOKIE, ""))
                .path("/")
                .build(),
        )
    }

    fn username_matches(&self, candidate: &str) -> bool {
        bool::from(
            candidate
                .as_bytes()
                .ct_eq(self.credentials.username.as_bytes()),
        )
    }

    fn password_matches(&self, candidate: &str) -> bool {
        bool::from(
            candidate
                .as_bytes()
                .ct_eq(self.credentials.password.as_bytes()),
        )
    }
}
