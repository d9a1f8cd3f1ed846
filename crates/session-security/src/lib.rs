//! # Session Security
//! 
//! Cookie value encryption and session identifier generation.

pub mod cipher;
pub mod id;

pub use cipher::{decrypt, encrypt, ChaChaCipher, CipherError, CookieCipher};
pub use id::{IdGenerator, RandomHexId, RequestContext};
