//! Argon2id fingerprint derivation.

use argon2::{Algorithm, Argon2, Params, Version};
use common::{Fingerprint, SyncError};
use rand::{rngs::OsRng, RngCore};
use tracing::warn;

/// Byte length of a freshly drawn salt.
pub const SALT_LEN: usize = 16;

/// Byte length of the raw digest before hex encoding.
pub const DIGEST_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl FingerprintParams {
    fn of(fp: &Fingerprint) -> Self {
        Self {
            memory_kib: fp.memory_kib,
            iterations: fp.iterations,
            parallelism: fp.parallelism,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, SyncError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(DIGEST_LEN),
        )
        .map_err(|e| SyncError::Fingerprint(format!("invalid Argon2 parameters: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for FingerprintParams {
    /// The `argon2` crate's defaults: 19 MiB, two passes, one lane.
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Computes [`Fingerprint`]s for new bindings and recomputes them for known ones.
#[derive(Debug, Clone, Default)]
pub struct FingerprintEngine {
    params: FingerprintParams,
}

impl FingerprintEngine {
    /// An engine that uses `params` whenever it has to draw a new salt.
    pub fn new(params: FingerprintParams) -> Self {
        Self { params }
    }

    /// Fingerprint `secret`.
    ///
    /// When `previous` is given its salt and parameters are reused, so the
    /// result equals `previous` exactly when the secret is unchanged. A
    /// previous record that cannot be reused (bad hex, invalid parameters,
    /// or any cost above this engine's own) is replaced with one under a
    /// fresh salt.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fingerprint`] only if this engine's own parameters
    /// are invalid.
    pub fn fingerprint(
        &self,
        secret: &[u8],
        previous: Option<&Fingerprint>,
    ) -> Result<Fingerprint, SyncError> {
        if let Some(prev) = previous {
            match reuse(prev, self.params, secret) {
                Ok(fp) => return Ok(fp),
                Err(e) => warn!(error = %e, "stored fingerprint unusable; drawing a new salt"),
            }
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        derive(self.params, &salt, secret)
    }
}

// Stored costs come from the binding document and are capped at `ceiling`.
fn reuse(
    prev: &Fingerprint,
    ceiling: FingerprintParams,
    secret: &[u8],
) -> Result<Fingerprint, SyncError> {
    let params = FingerprintParams::of(prev);
    if params.memory_kib > ceiling.memory_kib
        || params.iterations > ceiling.iterations
        || params.parallelism > ceiling.parallelism
    {
        return Err(SyncError::Fingerprint(format!(
            "stored Argon2 parameters {params:?} exceed {ceiling:?}"
        )));
    }
    let salt = hex::decode(&prev.salt)
        .map_err(|e| SyncError::Fingerprint(format!("stored salt is not hex: {e}")))?;
    derive(params, &salt, secret)
}

fn derive(params: FingerprintParams, salt: &[u8], secret: &[u8]) -> Result<Fingerprint, SyncError> {
    let mut out = [0u8; DIGEST_LEN];
    params
        .hasher()?
        .hash_password_into(secret, salt, &mut out)
        .map_err(|e| SyncError::Fingerprint(format!("Argon2 derivation failed: {e}")))?;

    Ok(Fingerprint {
        memory_kib: params.memory_kib,
        iterations: params.iterations,
        parallelism: params.parallelism,
        salt: hex::encode(salt),
        digest: hex::encode(out),
    })
}

#[cfg(test)]
pub(crate) fn cheap_params() -> FingerprintParams {
    FingerprintParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}
