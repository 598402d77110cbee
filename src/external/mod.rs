pub mod aws_sigv4;
pub mod client;

pub use aws_sigv4::{SigV4Signer, SigningError};
pub use client::build_http_client;
