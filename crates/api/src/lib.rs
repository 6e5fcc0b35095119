//! HTTP API layer for bailiff.
//!
//! - **Endpoints**: auth, cases, hearings, attendance, absence reasons,
//!   notifications and settings
//! - **Extractors**: the signed-in user, with role guards
//! - **Middleware**: session resolution from the `token` cookie or a bearer
//!   header
//!
//! Every response uses the `{ success, data, message }` envelope.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use response::ApiResponse;
