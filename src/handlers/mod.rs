pub mod admin;
pub mod auth;
pub mod comment;
pub mod question;
pub mod system;
pub mod tag;
pub mod user;
