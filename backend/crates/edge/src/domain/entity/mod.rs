pub mod exchange;
pub mod session;
