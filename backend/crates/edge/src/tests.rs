//! Router-level tests for the edge crate
//! Each scenario runs the full stack: cookie, middleware, dispatcher, refresh.

#[cfg(test)]
mod harness {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode, header};
    use bytes::Bytes;
    use tower::ServiceExt;

    use crate::application::config::EdgeConfig;
    use crate::domain::value_object::session_id::SessionId;
    use crate::infra::memory::MemorySessionStore;
    use crate::presentation::cookie::issue_session_cookie;
    use crate::presentation::router::edge_router_generic;
    use crate::test_support::{ScriptedBackend, seed_session};

    pub struct Harness {
        pub router: Router,
        pub store: MemorySessionStore,
        pub backend: Arc<ScriptedBackend>,
        pub config: EdgeConfig,
    }

    pub struct Reply {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Bytes,
    }

    impl Reply {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).unwrap()
        }

        pub fn set_cookies(&self) -> Vec<String> {
            self.headers
                .get_all(header::SET_COOKIE)
                .iter()
                .map(|v| v.to_str().unwrap().to_string())
                .collect()
        }

        /// `name=value` of the last Set-Cookie, ready for a Cookie header
        pub fn cookie(&self) -> Option<String> {
            self.set_cookies()
                .last()
                .and_then(|c| c.split(';').next().map(str::to_string))
        }
    }

    pub fn harness(backend: ScriptedBackend) -> Harness {
        harness_with(backend, EdgeConfig::with_random_secret())
    }

    pub fn harness_with(backend: ScriptedBackend, config: EdgeConfig) -> Harness {
        let store = MemorySessionStore::new();
        let backend = Arc::new(backend);
        let router = edge_router_generic(
            Arc::new(store.clone()),
            Arc::clone(&backend),
            config.clone(),
        );
        Harness {
            router,
            store,
            backend,
            config,
        }
    }

    impl Harness {
        /// Seed a session and return its id with a matching Cookie header
        pub async fn signed_in(&self, access: &str, refresh: &str) -> (SessionId, String) {
            let (session_id, _) = seed_session(&self.store, access, refresh).await;
            (session_id, self.cookie_for(&session_id))
        }

        pub fn cookie_for(&self, session_id: &SessionId) -> String {
            let set_cookie = issue_session_cookie(&self.config, session_id).unwrap();
            set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string()
        }

        pub async fn send(&self, req: Request<Body>) -> Reply {
            send(self.router.clone(), req).await
        }
    }

    pub async fn send(router: Router, req: Request<Body>) -> Reply {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }
}

#[cfg(test)]
mod proxy_tests {
    use super::harness::*;
    use crate::domain::repository::SessionStore;
    use crate::test_support::ScriptedBackend;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    #[tokio::test]
    async fn test_valid_access_passes_through() {
        let h = harness(ScriptedBackend::new().with_valid_access("A1"));
        let (_, cookie) = h.signed_in("A1", "R1").await;

        let reply = h
            .send(request("GET", "/proxy/workshops?page=2", Some(&cookie), ""))
            .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["ok"], true);
        assert_eq!(reply.headers["x-backend"], "scripted");
        assert!(reply.set_cookies().is_empty());
        assert_eq!(h.backend.refresh_calls(), 0);

        let seen = h.backend.seen_calls();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/workshops?page=2");
        assert_eq!(seen[0].bearer.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_domain_error_is_relayed_unchanged() {
        let h = harness(ScriptedBackend::new().with_valid_access("A1"));
        let (_, cookie) = h.signed_in("A1", "R1").await;

        let reply = h
            .send(request("DELETE", "/proxy/status/404", Some(&cookie), ""))
            .await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.json()["message"], "Scripted status");
        assert!(reply.headers.get("x-auth-required").is_none());
    }

    #[tokio::test]
    async fn test_expired_access_is_renewed_and_replayed() {
        let h = harness(ScriptedBackend::new().with_refresh_grant("R1", "A2", "R2"));
        let (session_id, cookie) = h.signed_in("A1", "R1").await;
        let body = r#"{"title":"Ownership in practice","seats":12}"#;

        let reply = h
            .send(request("POST", "/proxy/workshops", Some(&cookie), body))
            .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.as_ref(), body.as_bytes());

        let seen = h.backend.seen_calls();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].bearer.as_deref(), Some("A1"));
        assert_eq!(seen[1].bearer.as_deref(), Some("A2"));
        assert_eq!(seen[0].body, seen[1].body);
        assert_eq!(h.backend.refresh_calls(), 1);

        let stored = h.store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.access_token.expose(), "A2");
        assert_eq!(stored.refresh_token.expose(), "R2");

        let renewed_cookie = reply.set_cookies().pop().unwrap();
        assert!(renewed_cookie.contains("Max-Age=604800"));
        assert_eq!(reply.cookie().unwrap(), cookie);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_expiry_triggers_one_refresh() {
        let h = harness(
            ScriptedBackend::new()
                .with_refresh_grant("R1", "A2", "R2")
                .with_refresh_delay(std::time::Duration::from_millis(50)),
        );
        let (session_id, cookie) = h.signed_in("A1", "R1").await;

        let calls: Vec<_> = (0..10)
            .map(|i| {
                let router = h.router.clone();
                let req = request("GET", &format!("/proxy/workshops/{i}"), Some(&cookie), "");
                tokio::spawn(async move { send(router, req).await })
            })
            .collect();

        for reply in futures::future::join_all(calls).await {
            assert_eq!(reply.unwrap().status, StatusCode::OK);
        }

        assert_eq!(h.backend.refresh_calls(), 1);
        let stored = h.store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.access_token.expose(), "A2");
    }

    #[tokio::test]
    async fn test_rejected_refresh_ends_session() {
        let h = harness(ScriptedBackend::new());
        let (session_id, cookie) = h.signed_in("A1", "R-revoked").await;

        let reply = h
            .send(request("GET", "/proxy/workshops", Some(&cookie), ""))
            .await;

        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.headers["x-auth-required"], "true");
        assert!(reply.set_cookies()[0].contains("Max-Age=0"));
        assert!(h.store.get(&session_id).await.unwrap().is_none());

        // The ended session never reaches the backend again
        let domain_calls = h.backend.domain_calls();
        let reply = h
            .send(request("GET", "/proxy/workshops", Some(&cookie), ""))
            .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(h.backend.domain_calls(), domain_calls);
    }

    #[tokio::test]
    async fn test_no_second_refresh_after_replay_rejection() {
        let h = harness(
            ScriptedBackend::new()
                .with_refresh_grant("R1", "A2", "R2")
                .rejecting_all_access(),
        );
        let (session_id, cookie) = h.signed_in("A1", "R1").await;

        let reply = h
            .send(request("GET", "/proxy/workshops", Some(&cookie), ""))
            .await;

        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.headers["x-auth-required"], "true");
        assert_eq!(h.backend.refresh_calls(), 1);
        assert_eq!(h.backend.domain_calls(), 2);

        // The refresh succeeded, so the session and its cookie survive
        let kept = h.store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(kept.refresh_token.expose(), "R2");
        assert!(reply.set_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_503_and_keeps_session() {
        let h = harness(ScriptedBackend::new().with_valid_access("A1"));
        h.backend.set_reachable(false);
        let (session_id, cookie) = h.signed_in("A1", "R1").await;

        let reply = h
            .send(request("GET", "/proxy/workshops", Some(&cookie), ""))
            .await;

        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            reply.headers[header::CONTENT_TYPE],
            "application/problem+json"
        );
        assert!(h.store.get(&session_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthenticated() {
        let h = harness(ScriptedBackend::new());

        let reply = h.send(request("GET", "/proxy/workshops", None, "")).await;

        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.headers["x-auth-required"], "true");
        assert_eq!(h.backend.domain_calls(), 0);
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_unauthenticated() {
        let h = harness(ScriptedBackend::new().with_valid_access("A1"));
        let (_, cookie) = h.signed_in("A1", "R1").await;
        let (_, signature) = cookie.rsplit_once('.').unwrap();
        let forged = format!(
            "{}={}.{}",
            h.config.session_cookie_name,
            crate::domain::value_object::session_id::SessionId::new(),
            signature
        );

        let reply = h
            .send(request("GET", "/proxy/workshops", Some(&forged), ""))
            .await;

        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(h.backend.domain_calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_before_forwarding() {
        let config = crate::application::config::EdgeConfig {
            max_body_bytes: 16,
            ..crate::application::config::EdgeConfig::with_random_secret()
        };
        let h = harness_with(ScriptedBackend::new().with_valid_access("A1"), config);
        let (_, cookie) = h.signed_in("A1", "R1").await;

        let reply = h
            .send(request("POST", "/proxy/uploads", Some(&cookie), &"x".repeat(64)))
            .await;

        assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(h.backend.domain_calls(), 0);
    }

    #[tokio::test]
    async fn test_hop_by_hop_and_edge_headers_are_not_forwarded() {
        let h = harness(ScriptedBackend::new().with_valid_access("A1"));
        let (_, cookie) = h.signed_in("A1", "R1").await;

        let req = Request::builder()
            .method("GET")
            .uri("/proxy/workshops")
            .header(header::COOKIE, &cookie)
            .header(header::AUTHORIZATION, "Bearer forged")
            .header(header::CONNECTION, "x-private")
            .header("x-private", "secret")
            .header("keep-alive", "timeout=5")
            .header("x-trace", "7")
            .body(Body::empty())
            .unwrap();
        let reply = h.send(req).await;
        assert_eq!(reply.status, StatusCode::OK);

        let seen = h.backend.seen_calls();
        assert_eq!(seen[0].method, axum::http::Method::GET);
        let headers = &seen[0].headers;
        assert_eq!(headers["x-trace"], "7");
        assert!(headers.get(header::COOKIE).is_none());
        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("x-private").is_none());
        assert!(headers.get("keep-alive").is_none());
        assert_eq!(seen[0].bearer.as_deref(), Some("A1"));
    }
}

#[cfg(test)]
mod session_tests {
    use super::harness::*;
    use crate::test_support::ScriptedBackend;
    use axum::http::StatusCode;

    fn login_body(password: &str) -> String {
        serde_json::json!({ "identifier": "ada", "password": password }).to_string()
    }

    #[tokio::test]
    async fn test_login_then_who_am_i() {
        let h = harness(ScriptedBackend::new().with_login("A1", "R1"));

        let reply = h
            .send(request("POST", "/auth/login", None, &login_body(ScriptedBackend::PASSWORD)))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["authenticated"], true);
        let cookie = reply.cookie().unwrap();
        assert!(cookie.starts_with("edu_session="));
        assert!(!String::from_utf8_lossy(&reply.body).contains("A1"));

        let reply = h.send(request("GET", "/auth/me", Some(&cookie), "")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["authenticated"], true);
        assert_eq!(reply.json()["user"]["username"], "ada");
        assert_eq!(reply.json()["user"]["role"], "ADMIN");
    }

    #[tokio::test]
    async fn test_login_refusal_is_relayed() {
        let h = harness(ScriptedBackend::new().with_login("A1", "R1"));

        let reply = h
            .send(request("POST", "/auth/login", None, &login_body("wrong")))
            .await;

        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.json()["message"], "Invalid credentials");
        assert!(reply.set_cookies().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_register_opens_session() {
        let h = harness(ScriptedBackend::new().with_login("A1", "R1"));
        let body = serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": ScriptedBackend::PASSWORD,
        })
        .to_string();

        let reply = h.send(request("POST", "/auth/register", None, &body)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.cookie().is_some());
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_who_am_i_without_session() {
        let h = harness(ScriptedBackend::new());

        let reply = h.send(request("GET", "/auth/me", None, "")).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.as_ref(), br#"{"authenticated":false}"#);
    }

    #[tokio::test]
    async fn test_who_am_i_renews_and_reissues_cookie() {
        let h = harness(ScriptedBackend::new().with_refresh_grant("R1", "A2", "R2"));
        let (_, cookie) = h.signed_in("A1", "R1").await;

        let reply = h.send(request("GET", "/auth/me", Some(&cookie), "")).await;

        assert_eq!(reply.json()["authenticated"], true);
        assert_eq!(reply.cookie().unwrap(), cookie);
        assert_eq!(h.backend.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent_without_backend() {
        let h = harness(ScriptedBackend::new());
        h.backend.set_reachable(false);
        let (session_id, cookie) = h.signed_in("A1", "R1").await;

        for _ in 0..2 {
            let reply = h
                .send(request("POST", "/auth/logout", Some(&cookie), ""))
                .await;
            assert_eq!(reply.status, StatusCode::NO_CONTENT);
            assert!(reply.set_cookies()[0].contains("Max-Age=0"));
        }

        assert!(h.store.is_empty());
        assert!(
            crate::domain::repository::SessionStore::get(&h.store, &session_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_login_replaces_previous_session() {
        let h = harness(ScriptedBackend::new().with_login("A9", "R9"));
        let (old_session, cookie) = h.signed_in("A1", "R1").await;

        let reply = h
            .send(request(
                "POST",
                "/auth/login",
                Some(&cookie),
                &login_body(ScriptedBackend::PASSWORD),
            ))
            .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_ne!(reply.cookie().unwrap(), cookie);
        assert_eq!(h.store.len(), 1);
        assert_ne!(reply.cookie().unwrap(), h.cookie_for(&old_session));
    }
}
