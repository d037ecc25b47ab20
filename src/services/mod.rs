pub mod admin;
pub mod auth;
pub mod bootstrap_admin;
pub mod comment;
pub mod email;
pub mod question;
pub mod reaction;
pub mod tag;
pub mod upload;
pub mod user;
