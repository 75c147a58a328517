// Authentication module
// Verifies JWT access tokens and gates admin routes by role

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

pub use error::AuthError;
pub use middleware::{require_admin, AuthenticatedUser, MaybeUser};
pub use models::Role;
pub use token::{Claims, TokenService};
