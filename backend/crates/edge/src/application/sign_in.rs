//! Sign In Use Case
//!
//! Exchanges user credentials for a backend token pair and opens an edge
//! session holding it.

use std::sync::Arc;

use http::Method;
use serde::Serialize;

use crate::application::config::EdgeConfig;
use crate::domain::backend::{BackendClient, CallOutcome};
use crate::domain::entity::exchange::{BackendResponse, RequestDescriptor};
use crate::domain::entity::session::{Session, TokenPair};
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::{EdgeError, EdgeResult};

/// Sign in input
pub struct SignInInput {
    /// User name or email
    pub identifier: String,
    pub password: String,
}

/// Sign in output
#[derive(Debug)]
pub enum SignInOutput {
    /// New session opened; its id goes into the session cookie
    Established { session_id: SessionId },
    /// Backend refused; relayed to the caller verbatim
    Declined(BackendResponse),
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    identifier: &'a str,
    password: &'a str,
}

/// Sign in use case
pub struct SignInUseCase<S, B>
where
    S: SessionStore,
    B: BackendClient,
{
    store: Arc<S>,
    backend: Arc<B>,
    config: Arc<EdgeConfig>,
}

impl<S, B> SignInUseCase<S, B>
where
    S: SessionStore,
    B: BackendClient,
{
    pub fn new(store: Arc<S>, backend: Arc<B>, config: Arc<EdgeConfig>) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Sign in, replacing `previous` if the caller already had a session
    pub async fn execute(
        &self,
        input: SignInInput,
        previous: Option<SessionId>,
    ) -> EdgeResult<SignInOutput> {
        let payload = LoginPayload {
            identifier: &input.identifier,
            password: &input.password,
        };
        let request = RequestDescriptor::json(Method::POST, self.config.login_path.as_str(), &payload)
            .map_err(|e| EdgeError::Internal(format!("Failed to encode login payload: {e}")))?;

        establish_session(
            self.store.as_ref(),
            self.backend.as_ref(),
            &self.config,
            &request,
            previous,
        )
        .await
    }
}

/// Send an unauthenticated credential exchange and store the issued pair
pub(crate) async fn establish_session<S, B>(
    store: &S,
    backend: &B,
    config: &EdgeConfig,
    request: &RequestDescriptor,
    previous: Option<SessionId>,
) -> EdgeResult<SignInOutput>
where
    S: SessionStore,
    B: BackendClient,
{
    let response = match backend.call(None, request).await {
        CallOutcome::Unreachable(reason) => return Err(EdgeError::BackendUnavailable(reason)),
        CallOutcome::Unauthorized(response) => return Ok(SignInOutput::Declined(response)),
        CallOutcome::Completed(response) if !response.is_success() => {
            return Ok(SignInOutput::Declined(response));
        }
        CallOutcome::Completed(response) => response,
    };

    let pair = TokenPair::parse(response.body()).map_err(|e| EdgeError::BadGateway(e.to_string()))?;

    if let Some(previous) = previous {
        store.clear(&previous).await?;
    }

    let session_id = SessionId::new();
    store
        .put(&session_id, Session::from_pair(pair, config.session_ttl))
        .await?;

    tracing::info!(session_id = %session_id, path = request.path(), "Session established");

    Ok(SignInOutput::Established { session_id })
}
