//! Error types for admission components.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("invalid whitelist entry {entry}: {reason}")]
    InvalidWhitelistEntry { entry: String, reason: String },

    #[error("invalid CIDR prefix length {prefix_len} for {entry}")]
    InvalidPrefixLength { entry: String, prefix_len: u8 },
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
