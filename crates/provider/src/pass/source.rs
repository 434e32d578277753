//! [`PassSecretSource`]: runs the `pass` CLI as a subprocess.

use async_trait::async_trait;
use common::SyncError;
use tokio::process::Command;
use tracing::debug;

use super::{SecretSource, SecretValue};

/// Environment variable `pass` reads its store directory from.
pub const STORE_DIR_ENV: &str = "PASSWORD_STORE_DIR";

/// Fetches secrets by invoking `<binary> <key>`.
#[derive(Debug, Clone)]
pub struct PassSecretSource {
    binary: String,
}

impl PassSecretSource {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PassSecretSource {
    fn default() -> Self {
        Self::new("pass")
    }
}

#[async_trait]
impl SecretSource for PassSecretSource {
    async fn fetch(&self, pass_dir: &str, pass_key: &str) -> Result<SecretValue, SyncError> {
        debug!(pass_key, pass_dir, "fetching secret from pass");

        let mut cmd = Command::new(&self.binary);
        cmd.arg(pass_key).kill_on_drop(true);
        if !pass_dir.is_empty() {
            cmd.env(STORE_DIR_ENV, pass_dir);
        }

        let output = cmd.output().await.map_err(|e| SyncError::SecretRetrieval {
            key: pass_key.to_owned(),
            status: format!("failed to start `{}`", self.binary),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(SyncError::SecretRetrieval {
                key: pass_key.to_owned(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
            });
        }

        Ok(SecretValue::from_output(output.stdout))
    }
}
