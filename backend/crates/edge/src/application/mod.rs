//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod dispatch;
pub mod refresh;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod who_am_i;

// Re-exports
pub use config::EdgeConfig;
pub use dispatch::{Forwarded, ProxyDispatcher};
pub use refresh::{RefreshCoordinator, RefreshFailure, RefreshOutcome};
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use who_am_i::{UserSummary, WhoAmIOutput, WhoAmIUseCase};
