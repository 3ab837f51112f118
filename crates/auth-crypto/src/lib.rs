pub mod encryption;
pub mod hashing;
pub mod jwt;
pub mod keys;

pub use encryption::{EncryptionError, TokenEncryptor};
pub use hashing::{hash_token, PasswordHasher};
pub use jwt::{JwtError, JwtService};
pub use keys::{KeyError, SigningKey};
