//! Sign Up Use Case
//!
//! Registers an account at the backend; the issued pair opens a session
//! exactly like sign-in.

use std::sync::Arc;

use http::Method;
use serde::Serialize;

use crate::application::config::EdgeConfig;
use crate::application::sign_in::{SignInOutput, establish_session};
use crate::domain::backend::BackendClient;
use crate::domain::entity::exchange::RequestDescriptor;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::{EdgeError, EdgeResult};

/// Sign up input
#[derive(Serialize)]
pub struct SignUpInput {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
}

/// Sign up use case
pub struct SignUpUseCase<S, B>
where
    S: SessionStore,
    B: BackendClient,
{
    store: Arc<S>,
    backend: Arc<B>,
    config: Arc<EdgeConfig>,
}

impl<S, B> SignUpUseCase<S, B>
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

    pub async fn execute(
        &self,
        input: SignUpInput,
        previous: Option<SessionId>,
    ) -> EdgeResult<SignInOutput> {
        let request = RequestDescriptor::json(Method::POST, self.config.register_path.as_str(), &input)
            .map_err(|e| EdgeError::Internal(format!("Failed to encode register payload: {e}")))?;

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
