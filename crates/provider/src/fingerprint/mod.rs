//! One-way fingerprints of `pass` secrets.
//!
//! A fingerprint lets local state record *which* secret was last seen without
//! recording the secret itself. It goes into the binding file, so the
//! derivation is deliberately expensive: Argon2id with a per-binding random
//! salt.
//!
//! # Salt and parameters
//!
//! The salt and Argon2 parameters are stored next to the digest and reused on
//! every later run, so an unchanged secret always yields the same digest and
//! two fingerprints of one binding can be compared with `==`.

pub mod engine;

pub use engine::{FingerprintEngine, FingerprintParams};
