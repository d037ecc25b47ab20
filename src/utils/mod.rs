pub mod cookie;
pub mod jwt;
pub mod markdown;
pub mod multipart;
pub mod params;
pub mod password;
pub mod reset_code;

pub use jwt::encode_session_token;
pub use markdown::render_markdown;
pub use params::{parse_uuid, parse_uuid_list};
pub use password::{hash_password, verify_password};
