pub mod auth;
pub mod metrics;

pub use auth::AuthUser;
