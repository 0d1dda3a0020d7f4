//! Security adapters: password hashing and session token signing.

mod password;
mod tokens;

pub use password::Argon2PasswordHasher;
pub use tokens::{HmacTokenCodec, SigningSecret, DEFAULT_TOKEN_TTL};
