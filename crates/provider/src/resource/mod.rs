//! Lifecycle of a `pass` → SSM binding: exists, read, create/update, delete, import.
//!
//! # Drift detection
//!
//! Two surrogates stand in for the secret itself:
//!
//! - a fingerprint of the value currently in `pass`, recomputed on every read,
//!   records which local secret was last seen;
//! - the parameter's last-modified time in SSM, obtained with
//!   `DescribeParameters`, shows remote changes without decrypting anything.
//!
//! Both are persisted and left for the caller to diff. Nothing in this module
//! decides on its own that a put is needed.
//!
//! # Module invariants
//!
//! - Plaintext is fetched only by read and put, and never stored in a
//!   [`common::SecretBinding`].
//! - No call here asks SSM for a decrypted value.

pub mod lifecycle;

pub use lifecycle::ParameterFromPass;
