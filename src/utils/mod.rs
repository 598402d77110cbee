pub mod encryption;
pub mod time;
pub mod validate;

pub use encryption::{CryptoError, Encryptor};
pub use validate::ValidatedJson;
