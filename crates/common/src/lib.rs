//! Binding model, ARN composition, and errors shared across `pass-ssm-sync` crates.

pub mod arn;
pub mod binding;
pub mod error;

pub use arn::AwsIdentity;
pub use binding::{BindingConfig, BindingStatus, Fingerprint, SecretBinding};
pub use error::SyncError;
