pub mod credential;
pub mod session_id;
