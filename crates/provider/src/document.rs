//! The binding document: declared config plus persisted state in one JSON file.
//!
//! ```json
//! {
//!   "config": { "parameter_name": "/app/db/password", "pass_key": "app/db" },
//!   "state":  { "id": "/app/db/password", "fingerprint": { ... }, ... }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use common::{BindingConfig, SecretBinding};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDocument {
    pub config: BindingConfig,
    /// Last persisted state; absent for a binding that was never created.
    #[serde(default)]
    pub state: SecretBinding,
}

impl BindingDocument {
    /// Read and validate a binding document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the declared
    /// config is invalid.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read binding document {}", path.display()))?;
        let doc: BindingDocument = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse binding document {}", path.display()))?;
        doc.config
            .validate()
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(doc)
    }

    /// Write the document next to `path` and rename it into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("failed to serialise binding document")?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}
