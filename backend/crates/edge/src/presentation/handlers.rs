//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, Request, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::application::config::EdgeConfig;
use crate::application::{
    ProxyDispatcher, SignInInput, SignInOutput, SignInUseCase, SignOutUseCase, SignUpInput,
    SignUpUseCase, WhoAmIUseCase,
};
use crate::domain::backend::BackendClient;
use crate::domain::entity::exchange::{BackendResponse, RequestDescriptor};
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::{EdgeError, EdgeResult};
use crate::presentation::cookie::{clear_session_cookie, issue_session_cookie};
use crate::presentation::dto::{
    SessionEstablishedResponse, SignInRequest, SignUpRequest, WhoAmIResponse,
};
use crate::presentation::middleware::SessionContext;

/// Router-relative prefix of proxied routes
pub const PROXY_PREFIX: &str = "/proxy";

/// Shared state for edge handlers
pub struct EdgeAppState<S, B> {
    pub store: Arc<S>,
    pub backend: Arc<B>,
    pub dispatcher: Arc<ProxyDispatcher<S, B>>,
    pub config: Arc<EdgeConfig>,
}

impl<S, B> EdgeAppState<S, B>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, backend: Arc<B>, config: Arc<EdgeConfig>) -> Self {
        let dispatcher = Arc::new(ProxyDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&backend),
            Arc::clone(&config),
        ));
        Self {
            store,
            backend,
            dispatcher,
            config,
        }
    }
}

impl<S, B> Clone for EdgeAppState<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
            dispatcher: Arc::clone(&self.dispatcher),
            config: Arc::clone(&self.config),
        }
    }
}

// ============================================================================
// Sign In / Sign Up
// ============================================================================

/// POST /api/auth/login
pub async fn sign_in<S, B>(
    State(state): State<EdgeAppState<S, B>>,
    Extension(context): Extension<SessionContext>,
    Json(req): Json<SignInRequest>,
) -> EdgeResult<Response>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(
        state.store.clone(),
        state.backend.clone(),
        state.config.clone(),
    );

    let input = SignInInput {
        identifier: req.identifier,
        password: req.password,
    };

    let output = use_case.execute(input, context.session_id).await?;

    Ok(session_response(&state.config, output))
}

/// POST /api/auth/register
pub async fn sign_up<S, B>(
    State(state): State<EdgeAppState<S, B>>,
    Extension(context): Extension<SessionContext>,
    Json(req): Json<SignUpRequest>,
) -> EdgeResult<Response>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(
        state.store.clone(),
        state.backend.clone(),
        state.config.clone(),
    );

    let input = SignUpInput {
        username: req.username,
        email: req.email,
        password: req.password,
    };

    let output = use_case.execute(input, context.session_id).await?;

    Ok(session_response(&state.config, output))
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/auth/logout
pub async fn sign_out<S, B>(
    State(state): State<EdgeAppState<S, B>>,
    Extension(context): Extension<SessionContext>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let use_case = SignOutUseCase::new(
        state.store.clone(),
        state.backend.clone(),
        state.config.clone(),
    );

    // The cookie is cleared whether or not the store could be updated
    if let Err(e) = use_case.execute(context.session_id).await {
        tracing::warn!(error = %e, "Sign out could not clear the session");
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    append_clear_cookie(&mut response, &state.config);
    response
}

// ============================================================================
// Who Am I
// ============================================================================

/// GET /api/auth/me
pub async fn who_am_i<S, B>(
    State(state): State<EdgeAppState<S, B>>,
    Extension(context): Extension<SessionContext>,
) -> EdgeResult<Response>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let use_case = WhoAmIUseCase::new(state.dispatcher.clone(), state.config.clone());

    let output = use_case.execute(context.session_id).await?;

    let mut response = Json(WhoAmIResponse {
        authenticated: output.user.is_some(),
        user: output.user,
    })
    .into_response();

    if let (true, Some(session_id)) = (output.renewed, context.session_id) {
        append_session_cookie(&mut response, &state.config, &session_id);
    }
    if output.session_ended || context.cookie_rejected {
        append_clear_cookie(&mut response, &state.config);
    }

    Ok(response)
}

// ============================================================================
// Proxy
// ============================================================================

/// ANY /api/proxy/{*path}
pub async fn proxy<S, B>(
    State(state): State<EdgeAppState<S, B>>,
    Extension(context): Extension<SessionContext>,
    req: Request,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let session_id = context.session_id;
    match forward(&state, context, req).await {
        Ok(response) => response,
        Err(EdgeError::Unauthenticated) => {
            // A session that survived the failure keeps its cookie
            let held = match session_id {
                Some(session_id) => state.dispatcher.holds_session(&session_id).await,
                None => false,
            };
            if held {
                EdgeError::Unauthenticated.into_response()
            } else {
                error_response(&state.config, EdgeError::Unauthenticated)
            }
        }
        Err(e) => error_response(&state.config, e),
    }
}

async fn forward<S, B>(
    state: &EdgeAppState<S, B>,
    context: SessionContext,
    req: Request,
) -> EdgeResult<Response>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    let session_id = context.session_id.ok_or(EdgeError::Unauthenticated)?;
    let request = capture_request(req, state.config.max_body_bytes).await?;

    let forwarded = state.dispatcher.forward(&session_id, &request).await?;

    let mut response = relay(forwarded.response);
    if forwarded.renewed.is_some() {
        append_session_cookie(&mut response, &state.config, &session_id);
    }
    Ok(response)
}

/// Buffer the inbound request so it can be replayed after a refresh
async fn capture_request(req: Request, limit: usize) -> EdgeResult<RequestDescriptor> {
    let (parts, body) = req.into_parts();

    let body = axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            EdgeError::PayloadTooLarge { limit }
        } else {
            EdgeError::InvalidRequest(format!("Failed to read request body: {e}"))
        }
    })?;

    Ok(RequestDescriptor::new(parts.method, backend_path(&parts.uri))
        .with_headers(platform::headers::forwardable_request(&parts.headers))
        .with_body(body))
}

/// Backend path and query for a proxied URI
fn backend_path(uri: &Uri) -> String {
    let path = uri.path();
    let path = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);
    match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Backend response relayed verbatim
fn relay(response: BackendResponse) -> Response {
    let (status, headers, body) = response.into_parts();
    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

fn session_response(config: &EdgeConfig, output: SignInOutput) -> Response {
    match output {
        SignInOutput::Established { session_id } => {
            let mut response = Json(SessionEstablishedResponse {
                authenticated: true,
            })
            .into_response();
            append_session_cookie(&mut response, config, &session_id);
            response
        }
        SignInOutput::Declined(backend) => relay(backend),
    }
}

fn error_response(config: &EdgeConfig, error: EdgeError) -> Response {
    let unauthenticated = matches!(error, EdgeError::Unauthenticated);
    let mut response = error.into_response();
    if unauthenticated {
        append_clear_cookie(&mut response, config);
    }
    response
}

fn append_session_cookie(response: &mut Response, config: &EdgeConfig, session_id: &SessionId) {
    if let Some(cookie) = issue_session_cookie(config, session_id) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
}

fn append_clear_cookie(response: &mut Response, config: &EdgeConfig) {
    if let Some(cookie) = clear_session_cookie(config) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
}
