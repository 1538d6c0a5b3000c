//! Types held in the visitor's session.

pub mod session;

pub use session::{CurrentUser, UserView, keys as session_keys};
