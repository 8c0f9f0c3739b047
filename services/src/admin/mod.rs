//! Onboarding admin surface: the HTML form and its JSON counterpart.

pub mod page;
pub mod routes;

pub use routes::{AppState, CountUsersResponse, ErrorResponse, admin_routes, api_routes, status_for};
