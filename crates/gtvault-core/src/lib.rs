pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use error::{ErrorKind, GtvaultError, GtvaultResult};
pub use types::{CipherSuite, DecryptResponse, ErrorBody, StateSnapshot};
