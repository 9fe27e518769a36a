//! Authentication
//!
//! - Email/password accounts with Argon2id hashing
//! - Stateless HS256 access tokens carrying the `doctor` / `patient` role

pub mod password;
pub mod tokens;

pub use password::{PasswordError, PasswordHasher, MIN_PASSWORD_LENGTH};
pub use tokens::{TokenClaims, TokenError, TokenService};
