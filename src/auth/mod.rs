pub mod jwt;
pub mod password;
pub mod refresh;
pub mod service;

pub use jwt::{Claims, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH, TokenCodec, hash_token};
pub use password::{hash_password, verify_password};
pub use service::{AuthError, AuthService, TokenPair};
