//! The managed entity: one pairing of a `pass` entry with an SSM parameter.
//!
//! [`BindingConfig`] is what the operator declares. [`SecretBinding`] is what
//! gets persisted locally between runs. Neither ever holds a plaintext secret.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Declared configuration of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Remote parameter name. Changing it forces replacement.
    pub parameter_name: String,
    /// Lookup key inside the password store.
    pub pass_key: String,
    /// Password store directory; empty selects the default store.
    #[serde(default)]
    pub pass_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// KMS key used to encrypt the parameter; the account default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl BindingConfig {
    /// Create a validated configuration with the two required fields.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if either field is blank.
    pub fn new(
        parameter_name: impl Into<String>,
        pass_key: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let cfg = Self {
            parameter_name: parameter_name.into(),
            pass_key: pass_key.into(),
            pass_dir: String::new(),
            description: None,
            key_id: None,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_pass_dir(mut self, pass_dir: impl Into<String>) -> Self {
        self.pass_dir = pass_dir.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Check required fields. Called after deserialising a declared config.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.parameter_name.trim().is_empty() {
            return Err(SyncError::Validation(
                "parameter_name is required and must not be empty".into(),
            ));
        }
        if self.pass_key.trim().is_empty() {
            return Err(SyncError::Validation(
                "pass_key is required and must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// `true` when applying this config to `state` would rename an existing
    /// parameter, which must be done as delete + create rather than in place.
    pub fn requires_replacement(&self, state: &SecretBinding) -> bool {
        state.is_present() && state.parameter_name != self.parameter_name
    }
}

/// Reproducible one-way digest of a secret, safe to persist.
///
/// Carries the salt and key-derivation parameters needed to recompute the
/// digest for comparison. The digest is hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Hex-encoded salt.
    pub salt: String,
    /// Hex-encoded Argon2id output.
    pub digest: String,
}

/// Where a binding sits in its lifecycle, as seen from local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStatus {
    /// No remote parameter is tracked.
    Absent,
    /// Written, but derived fields have not been refreshed by a read yet.
    PresentUnverified,
    /// Read back and all derived fields refreshed.
    PresentVerified,
}

/// Locally persisted state of a binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBinding {
    /// Resource id; equal to the parameter name while present, empty when absent.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub parameter_name: String,
    #[serde(default)]
    pub pass_key: String,
    #[serde(default)]
    pub pass_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// Derived on every read; never used as input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    /// Remote last-modified timestamp; only compared for inequality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_in_parameterstore: Option<String>,
}

impl SecretBinding {
    /// An absent binding carrying the declared fields of `cfg`.
    pub fn from_config(cfg: &BindingConfig) -> Self {
        let mut binding = Self::default();
        binding.apply_config(cfg);
        binding
    }

    /// A binding known only by its remote name, as produced by an import.
    pub fn imported(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            parameter_name: name,
            ..Self::default()
        }
    }

    /// Copy the declared fields of `cfg` over this state.
    pub fn apply_config(&mut self, cfg: &BindingConfig) {
        self.parameter_name = cfg.parameter_name.clone();
        self.pass_key = cfg.pass_key.clone();
        self.pass_dir = cfg.pass_dir.clone();
        self.description = cfg.description.clone();
        if cfg.key_id.is_some() {
            self.key_id = cfg.key_id.clone();
        }
    }

    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }

    /// Drop the resource id, marking the binding absent.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn status(&self) -> BindingStatus {
        if !self.is_present() {
            BindingStatus::Absent
        } else if self.arn.is_none() || self.last_modified_in_parameterstore.is_none() {
            BindingStatus::PresentUnverified
        } else {
            BindingStatus::PresentVerified
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_blank_required_fields() {
        assert!(BindingConfig::new("", "app/db").is_err());
        assert!(BindingConfig::new("/app/db/password", "  ").is_err());
        assert!(BindingConfig::new("/app/db/password", "app/db").is_ok());
    }

    #[test]
    fn deserialised_config_defaults_optional_fields() {
        let cfg: BindingConfig =
            serde_json::from_str(r#"{"parameter_name":"/a","pass_key":"k"}"#).unwrap();
        assert_eq!(cfg.pass_dir, "");
        assert!(cfg.description.is_none());
        assert!(cfg.key_id.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn status_follows_lifecycle() {
        let cfg = BindingConfig::new("/a", "k").unwrap();
        let mut b = SecretBinding::from_config(&cfg);
        assert_eq!(b.status(), BindingStatus::Absent);

        b.id = "/a".into();
        assert_eq!(b.status(), BindingStatus::PresentUnverified);

        b.arn = Some("arn:aws:ssm:eu-west-2:1:parameter/a".into());
        b.last_modified_in_parameterstore = Some("2024-01-01T00:00:00Z".into());
        assert_eq!(b.status(), BindingStatus::PresentVerified);

        b.clear_id();
        assert_eq!(b.status(), BindingStatus::Absent);
    }

    #[test]
    fn status_serialises_snake_case() {
        assert_eq!(
            serde_json::to_value(BindingStatus::PresentVerified).unwrap(),
            "present_verified"
        );
    }

    #[test]
    fn rename_of_present_binding_requires_replacement() {
        let old = BindingConfig::new("/old", "k").unwrap();
        let mut state = SecretBinding::from_config(&old);
        let renamed = BindingConfig::new("/new", "k").unwrap();

        // Not yet created: a plain create, nothing to replace.
        assert!(!renamed.requires_replacement(&state));

        state.id = "/old".into();
        assert!(renamed.requires_replacement(&state));
        assert!(!old.with_description("d").requires_replacement(&state));
    }

    #[test]
    fn apply_config_keeps_observed_key_id_when_undeclared() {
        let cfg = BindingConfig::new("/a", "k").unwrap();
        let mut state = SecretBinding::imported("/a");
        state.key_id = Some("alias/aws/ssm".into());
        state.apply_config(&cfg);
        assert_eq!(state.key_id.as_deref(), Some("alias/aws/ssm"));
    }

    #[test]
    fn imported_binding_uses_name_verbatim() {
        let b = SecretBinding::imported("/app/db/password");
        assert_eq!(b.id, "/app/db/password");
        assert_eq!(b.parameter_name, "/app/db/password");
        assert_eq!(b.status(), BindingStatus::PresentUnverified);
    }

    #[test]
    fn state_serialisation_omits_unset_fields() {
        let b = SecretBinding::imported("/a");
        let json = serde_json::to_value(&b).unwrap();
        assert!(json.get("fingerprint").is_none());
        assert!(json.get("arn").is_none());
        assert_eq!(json["id"], "/a");
    }
}
