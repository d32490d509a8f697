//! Test doubles shared by the unit and router tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};

use crate::domain::backend::{BackendClient, CallOutcome};
use crate::domain::entity::exchange::{BackendResponse, RequestDescriptor};
use crate::domain::entity::session::{Session, TokenPair};
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::infra::memory::MemorySessionStore;

/// A call the scripted backend received on a domain route
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// In-process backend with one-time-use refresh credentials
///
/// Routes:
/// - `/auth/refresh` exchanges a granted refresh credential exactly once
/// - `/auth/login`, `/auth/register` issue the login pair for [`Self::PASSWORD`]
/// - `/auth/logout` always answers 204
/// - `/auth/me` returns a fixed user for a valid access credential
/// - `/status/{code}` answers with that status
/// - anything else echoes the request body
pub struct ScriptedBackend {
    valid_access: Mutex<HashSet<String>>,
    refresh_grants: Mutex<HashMap<String, (String, String)>>,
    login_pair: Option<(String, String)>,
    refresh_delay: Duration,
    malformed_refresh: bool,
    reject_all_access: bool,
    reachable: AtomicBool,
    refresh_calls: AtomicUsize,
    domain_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    seen: Mutex<Vec<SeenCall>>,
}

impl ScriptedBackend {
    pub const PASSWORD: &'static str = "correct horse";

    pub fn new() -> Self {
        Self {
            valid_access: Mutex::new(HashSet::new()),
            refresh_grants: Mutex::new(HashMap::new()),
            login_pair: None,
            refresh_delay: Duration::ZERO,
            malformed_refresh: false,
            reject_all_access: false,
            reachable: AtomicBool::new(true),
            refresh_calls: AtomicUsize::new(0),
            domain_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_valid_access(self, access: &str) -> Self {
        self.valid_access.lock().unwrap().insert(access.to_string());
        self
    }

    /// `refresh` may be exchanged once for `new_access` / `new_refresh`
    pub fn with_refresh_grant(self, refresh: &str, new_access: &str, new_refresh: &str) -> Self {
        self.refresh_grants.lock().unwrap().insert(
            refresh.to_string(),
            (new_access.to_string(), new_refresh.to_string()),
        );
        self
    }

    /// Pair issued by login and register
    pub fn with_login(mut self, access: &str, refresh: &str) -> Self {
        self.login_pair = Some((access.to_string(), refresh.to_string()));
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Refresh answers 2xx without a refresh token
    pub fn with_malformed_refresh(mut self) -> Self {
        self.malformed_refresh = true;
        self
    }

    /// Every access credential is rejected, renewed ones included
    pub fn rejecting_all_access(mut self) -> Self {
        self.reject_all_access = true;
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn domain_calls(&self) -> usize {
        self.domain_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn seen_calls(&self) -> Vec<SeenCall> {
        self.seen.lock().unwrap().clone()
    }

    fn is_valid_access(&self, bearer: Option<&str>) -> bool {
        !self.reject_all_access
            && bearer.is_some_and(|b| self.valid_access.lock().unwrap().contains(b))
    }

    async fn refresh(&self, bearer: Option<&str>) -> BackendResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }

        if self.malformed_refresh {
            return json_response(StatusCode::OK, r#"{"accessToken":"A-partial"}"#);
        }

        let grant = bearer.and_then(|b| self.refresh_grants.lock().unwrap().remove(b));
        match grant {
            Some((access, refresh)) => {
                self.valid_access.lock().unwrap().insert(access.clone());
                json_response(StatusCode::OK, pair_body(&access, &refresh))
            }
            None => json_response(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"Refresh token invalid"}"#,
            ),
        }
    }

    fn credential_exchange(&self, request: &RequestDescriptor, register: bool) -> BackendResponse {
        let payload: serde_json::Value =
            serde_json::from_slice(request.body()).unwrap_or(serde_json::Value::Null);

        if register && payload["username"] == "taken" {
            return json_response(StatusCode::CONFLICT, r#"{"message":"Username taken"}"#);
        }
        if payload["password"] != Self::PASSWORD {
            return json_response(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"Invalid credentials"}"#,
            );
        }

        match &self.login_pair {
            Some((access, refresh)) => {
                self.valid_access.lock().unwrap().insert(access.clone());
                json_response(StatusCode::OK, pair_body(access, refresh))
            }
            None => json_response(StatusCode::INTERNAL_SERVER_ERROR, "{}"),
        }
    }

    fn domain(&self, bearer: Option<&str>, request: &RequestDescriptor, route: &str) -> BackendResponse {
        self.domain_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(SeenCall {
            method: request.method().clone(),
            path: request.path().to_string(),
            bearer: bearer.map(str::to_string),
            headers: request.headers().clone(),
            body: request.body().clone(),
        });

        if !self.is_valid_access(bearer) {
            return json_response(StatusCode::UNAUTHORIZED, r#"{"message":"Token expired"}"#);
        }

        if route == "/auth/me" {
            return json_response(StatusCode::OK, r#"{"username":"ada","role":"ADMIN"}"#);
        }

        if let Some(code) = route.strip_prefix("/status/") {
            let status = code
                .parse::<u16>()
                .ok()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .unwrap_or(StatusCode::BAD_REQUEST);
            return json_response(status, r#"{"message":"Scripted status"}"#);
        }

        let body = if request.body().is_empty() {
            Bytes::from_static(br#"{"ok":true}"#)
        } else {
            request.body().clone()
        };
        let mut response = json_response(StatusCode::OK, body);
        let mut headers = response.headers().clone();
        headers.insert("x-backend", HeaderValue::from_static("scripted"));
        response = response.with_headers(headers);
        response
    }
}

impl BackendClient for ScriptedBackend {
    async fn call(&self, bearer: Option<&str>, request: &RequestDescriptor) -> CallOutcome {
        if !self.reachable.load(Ordering::SeqCst) {
            return CallOutcome::Unreachable("connection refused".to_string());
        }

        let route = request.path().split('?').next().unwrap_or_default();
        let response = match route {
            "/auth/refresh" => self.refresh(bearer).await,
            "/auth/login" => self.credential_exchange(request, false),
            "/auth/register" => self.credential_exchange(request, true),
            "/auth/logout" => {
                self.logout_calls.fetch_add(1, Ordering::SeqCst);
                BackendResponse::new(StatusCode::NO_CONTENT, Bytes::new())
            }
            _ => self.domain(bearer, request, route),
        };

        CallOutcome::from_response(response)
    }
}

fn pair_body(access: &str, refresh: &str) -> String {
    serde_json::json!({ "accessToken": access, "refreshToken": refresh }).to_string()
}

fn json_response(status: StatusCode, body: impl Into<Bytes>) -> BackendResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    BackendResponse::new(status, body).with_headers(headers)
}

/// Store a fresh session holding `access` / `refresh`
pub async fn seed_session(
    store: &MemorySessionStore,
    access: &str,
    refresh: &str,
) -> (SessionId, Session) {
    let session_id = SessionId::new();
    let session = Session::from_pair(TokenPair::new(access, refresh), Duration::from_secs(600));
    store.put(&session_id, session.clone()).await.unwrap();
    (session_id, session)
}
