//! Session keys.
//!
//! The session only ever holds the user id; the full user is loaded from the
//! database on each request that needs it.

/// Key for the logged-in user's id.
pub const USER_ID: &str = "user_id";

/// Key for pending flash messages.
pub const FLASH: &str = "flash";
