//! Who Am I Use Case
//!
//! Resolves the signed-in user through the backend identity endpoint. The
//! lookup goes through the dispatcher, so an expired access credential is
//! renewed like any other proxied call.

use std::sync::Arc;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::application::config::EdgeConfig;
use crate::application::dispatch::ProxyDispatcher;
use crate::domain::backend::BackendClient;
use crate::domain::entity::exchange::RequestDescriptor;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::session_id::SessionId;
use crate::error::{EdgeError, EdgeResult};

/// User as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdentityBody {
    Wrapped { user: UserSummary },
    Flat(UserSummary),
}

/// Who am I output
#[derive(Debug, Default)]
pub struct WhoAmIOutput {
    pub user: Option<UserSummary>,
    /// Session credentials were renewed during the lookup
    pub renewed: bool,
    /// Session could not be renewed and has been ended
    pub session_ended: bool,
}

/// Who am I use case
pub struct WhoAmIUseCase<S, B> {
    dispatcher: Arc<ProxyDispatcher<S, B>>,
    config: Arc<EdgeConfig>,
}

impl<S, B> WhoAmIUseCase<S, B>
where
    S: SessionStore + Send + Sync + 'static,
    B: BackendClient + Send + Sync + 'static,
{
    pub fn new(dispatcher: Arc<ProxyDispatcher<S, B>>, config: Arc<EdgeConfig>) -> Self {
        Self { dispatcher, config }
    }

    pub async fn execute(&self, session_id: Option<SessionId>) -> EdgeResult<WhoAmIOutput> {
        let Some(session_id) = session_id else {
            return Ok(WhoAmIOutput::default());
        };

        let request = RequestDescriptor::new(Method::GET, self.config.identity_path.as_str());

        match self.dispatcher.forward(&session_id, &request).await {
            Ok(forwarded) => {
                let user = if forwarded.response.is_success() {
                    match forwarded.response.json::<IdentityBody>() {
                        Ok(IdentityBody::Wrapped { user }) | Ok(IdentityBody::Flat(user)) => {
                            Some(user)
                        }
                        Err(e) => {
                            tracing::warn!(session_id = %session_id, error = %e, "Unusable identity response");
                            None
                        }
                    }
                } else {
                    tracing::debug!(
                        session_id = %session_id,
                        status = forwarded.response.status().as_u16(),
                        "Identity lookup refused"
                    );
                    None
                };

                Ok(WhoAmIOutput {
                    user,
                    renewed: forwarded.renewed.is_some(),
                    session_ended: false,
                })
            }
            Err(EdgeError::Unauthenticated) => Ok(WhoAmIOutput {
                user: None,
                renewed: false,
                session_ended: !self.dispatcher.holds_session(&session_id).await,
            }),
            Err(e) => Err(e),
        }
    }
}
