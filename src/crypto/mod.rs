/// Credential cryptography
///
/// Password hashing (argon2id) and signed bearer tokens (HS256 JWT).

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer, TokenKind};
