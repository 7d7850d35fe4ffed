// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const USER_CREATED: &str = "user.created";
pub const SIGNIN_SUCCEEDED: &str = "session.signin.succeeded";
pub const SIGNIN_FAILED: &str = "session.signin.failed";
pub const SIGNOUT: &str = "session.signout";
