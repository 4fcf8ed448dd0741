//! Shared primitives for the mashup workspace.
//!
//! This crate holds the small, dependency-light types every other member
//! uses: error locations and the redacted credential wrapper. Nothing here
//! knows about the collaboration protocol itself.

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
