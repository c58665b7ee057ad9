//! # Tipset Cryptography
//!
//! Signing support for self-created events:
//! - `HashSigner` - the seam the event creator signs through
//! - `Ed25519HashSigner` - Ed25519 over the BLAKE3 event hash
//!
//! | Function | Algorithm |
//! |----------|-----------|
//! | Event hash | BLAKE3 |
//! | Signature | Ed25519 |

pub mod error;
pub mod signer;

pub use error::*;
pub use signer::*;

/// Cryptographic prelude
pub mod prelude {
    pub use crate::error::{CryptoError, Result};
    pub use crate::signer::{verify, Ed25519HashSigner, HashSigner};
}
