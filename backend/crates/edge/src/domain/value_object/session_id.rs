use kernel::id::{Id, markers};

/// Edge session identity, issued at sign-in and carried in a signed cookie
pub type SessionId = Id<markers::Session>;
