//! Signal validation chain for the webhook gateway.
//!
//! The four stages run in order once the admission gates have passed:
//! 1. `SignatureVerifier`: HMAC-SHA256 authentication of the raw payload
//! 2. `PayloadValidator`: structural and policy validation of the signal
//! 3. `DataNormalizer`: symbol canonicalization, numeric cleaning, precision
//! 4. `PositionSizer`: risk-based quantity computation
//!
//! Every stage returns a typed error; the first failure short-circuits the
//! chain and determines the rejection reason.

pub mod normalizer;
pub mod signature;
pub mod sizing;
pub mod validator;

pub use normalizer::{DataNormalizer, NormalizerConfig};
pub use signature::SignatureVerifier;
pub use sizing::{PositionSizer, PositionSizingConfig};
pub use validator::{PayloadValidator, ValidatorConfig};
