//! Admin-side types that are not backend records.

pub mod session;

pub use session::{CurrentStaff, StaffView, keys as session_keys};
