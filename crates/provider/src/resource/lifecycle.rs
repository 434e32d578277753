//! [`ParameterFromPass`]: the binding lifecycle state machine.
//!
//! ```text
//! Absent --put--> PresentUnverified --read--> PresentVerified --put--> PresentVerified
//! PresentVerified --delete--> Absent
//! PresentVerified --read (parameter gone)--> Absent
//! ```
//!
//! `put` refreshes derived fields itself, so callers only observe
//! `PresentUnverified` after an import.

use common::{AwsIdentity, BindingConfig, SecretBinding, SyncError};
use tracing::{debug, info, warn};

use crate::aws::store::SECURE_STRING;
use crate::aws::{ParameterStore, PutParameter};
use crate::data_source::{self, ParameterLookup};
use crate::fingerprint::FingerprintEngine;
use crate::pass::{SecretSource, SecretValue};

/// Reconciles one binding at a time against a parameter store.
///
/// Holds no per-binding state, so one instance can serve any number of
/// bindings with distinct parameter names.
pub struct ParameterFromPass<S, P> {
    secrets: S,
    store: P,
    identity: AwsIdentity,
    fingerprints: FingerprintEngine,
}

impl<S: SecretSource, P: ParameterStore> ParameterFromPass<S, P> {
    pub fn new(
        secrets: S,
        store: P,
        identity: AwsIdentity,
        fingerprints: FingerprintEngine,
    ) -> Self {
        Self {
            secrets,
            store,
            identity,
            fingerprints,
        }
    }

    /// Whether the binding's parameter exists remotely.
    ///
    /// Issues a `GetParameter` with decryption disabled.
    ///
    /// # Errors
    ///
    /// Any remote error other than not-found.
    pub async fn exists(&self, binding: &SecretBinding) -> Result<bool, SyncError> {
        if !binding.is_present() {
            return Ok(false);
        }
        match self.store.get(&binding.id, false).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Refresh local state from the secret in `pass` and from SSM metadata.
    ///
    /// Recomputes the fingerprint, so a read changes local state even when
    /// nothing changed remotely. If the parameter has disappeared the binding
    /// id is cleared.
    ///
    /// # Errors
    ///
    /// [`SyncError::SecretRetrieval`] if `pass` fails, or any remote error
    /// other than not-found.
    pub async fn read(&self, binding: &mut SecretBinding) -> Result<(), SyncError> {
        if !binding.is_present() {
            debug!("binding is absent; nothing to read");
            return Ok(());
        }
        if binding.pass_key.is_empty() {
            return Err(SyncError::Validation(format!(
                "binding {} has no pass_key; set it before reading",
                binding.id
            )));
        }
        let secret = self.secrets.fetch(&binding.pass_dir, &binding.pass_key).await?;
        self.refresh(binding, &secret).await
    }

    /// Create or update the parameter from the secret in `pass`.
    ///
    /// `binding` is the previously persisted state (absent for a create). The
    /// description is only sent when it differs from what was last observed;
    /// the key id is sent when declared or previously observed. Finishes with
    /// the same refresh a read performs.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] for an invalid config, or a non-UTF-8 secret;
    /// [`SyncError::SecretRetrieval`] before any remote call if `pass` fails;
    /// any remote error.
    pub async fn put(
        &self,
        config: &BindingConfig,
        binding: &mut SecretBinding,
    ) -> Result<(), SyncError> {
        config.validate()?;
        let secret = self.secrets.fetch(&config.pass_dir, &config.pass_key).await?;

        let description_changed = if binding.is_present() {
            config.description != binding.description
        } else {
            config.description.is_some()
        };
        let observed_key_id = binding.is_present().then(|| binding.key_id.clone()).flatten();

        let mut input = PutParameter::secure_string(&config.parameter_name, secret.as_str()?);
        if description_changed {
            input.description = Some(config.description.clone().unwrap_or_default());
        }
        input.key_id = config.key_id.clone().or(observed_key_id);
        if let Some(key_id) = &input.key_id {
            debug!(parameter = %config.parameter_name, key_id = %key_id, "setting key_id");
        }

        info!(parameter = %config.parameter_name, "putting SSM parameter");
        self.store.put(input).await?;

        binding.apply_config(config);
        binding.id = config.parameter_name.clone();
        self.refresh(binding, &secret).await
    }

    /// Delete the parameter and mark the binding absent.
    ///
    /// # Errors
    ///
    /// Any remote error, not-found included.
    pub async fn delete(&self, binding: &mut SecretBinding) -> Result<(), SyncError> {
        info!(parameter = %binding.parameter_name, "deleting SSM parameter");
        self.store.delete(&binding.parameter_name).await?;
        binding.clear_id();
        Ok(())
    }

    /// Adopt an existing parameter by name. A following read fills in the rest.
    pub fn import(&self, name: &str) -> SecretBinding {
        info!(parameter = name, "importing SSM parameter");
        SecretBinding::imported(name)
    }

    /// Metadata-only lookup of any parameter through the same store and identity.
    ///
    /// # Errors
    ///
    /// Any remote error, including not-found.
    pub async fn lookup(&self, name: &str) -> Result<ParameterLookup, SyncError> {
        data_source::lookup_parameter(&self.store, &self.identity, name).await
    }

    async fn refresh(
        &self,
        binding: &mut SecretBinding,
        secret: &SecretValue,
    ) -> Result<(), SyncError> {
        let fingerprint = self
            .fingerprints
            .fingerprint(secret.as_bytes(), binding.fingerprint.as_ref())?;
        if binding
            .fingerprint
            .as_ref()
            .is_some_and(|prev| prev.digest != fingerprint.digest)
        {
            info!(id = %binding.id, "secret in pass has changed since it was last read");
        }
        binding.fingerprint = Some(fingerprint);

        debug!(id = %binding.id, "reading metadata of SSM parameter");
        let meta = match self.store.describe(&binding.id).await {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => {
                warn!(id = %binding.id, "SSM parameter not found, removing from state");
                binding.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if meta
            .parameter_type
            .as_deref()
            .is_some_and(|t| t != SECURE_STRING)
        {
            warn!(id = %binding.id, parameter_type = ?meta.parameter_type, "SSM parameter is not a SecureString");
        }
        if binding
            .last_modified_in_parameterstore
            .as_ref()
            .is_some_and(|prev| meta.last_modified.as_ref() != Some(prev))
        {
            info!(id = %binding.id, "SSM parameter was modified since it was last read");
        }

        binding.parameter_name = meta.name;
        binding.key_id = meta.key_id;
        binding.description = meta.description;
        binding.last_modified_in_parameterstore = meta.last_modified;
        binding.arn = Some(self.identity.parameter_arn(&binding.id).to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::store::memory::MemoryParameterStore;
    use crate::aws::store::{MockParameterStore, ParameterMetadata};
    use crate::fingerprint::engine::cheap_params;
    use crate::pass::MockSecretSource;
    use common::BindingStatus;

    fn identity() -> AwsIdentity {
        AwsIdentity::new("123456789012", "aws", "eu-west-2")
    }

    fn secrets(value: &'static str) -> MockSecretSource {
        let mut s = MockSecretSource::new();
        s.expect_fetch().returning(move |_, _| Ok(SecretValue::from(value)));
        s
    }

    fn reconciler<P: ParameterStore>(
        secrets: MockSecretSource,
        store: P,
    ) -> ParameterFromPass<MockSecretSource, P> {
        ParameterFromPass::new(secrets, store, identity(), FingerprintEngine::new(cheap_params()))
    }

    fn db_config() -> BindingConfig {
        BindingConfig::new("/app/db/password", "app/db").unwrap()
    }

    fn metadata(name: &str) -> ParameterMetadata {
        ParameterMetadata {
            name: name.to_owned(),
            parameter_type: Some("SecureString".into()),
            key_id: Some("alias/aws/ssm".into()),
            description: None,
            last_modified: Some("2024-01-01T00:00:01Z".into()),
        }
    }

    #[tokio::test]
    async fn put_then_read_end_to_end() {
        let mut store = MockParameterStore::new();
        store
            .expect_put()
            .withf(|input| {
                input.name == "/app/db/password"
                    && input.value.as_str() == "s3cr3t"
                    && input.parameter_type == "SecureString"
                    && input.overwrite
                    && input.description.is_none()
                    && input.key_id.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_describe()
            .withf(|name| name == "/app/db/password")
            .returning(|name| Ok(metadata(name)));
        store.expect_get().never();

        let mut secrets = MockSecretSource::new();
        secrets
            .expect_fetch()
            .withf(|dir, key| dir.is_empty() && key == "app/db")
            .returning(|_, _| Ok(SecretValue::from("s3cr3t")));

        let r = reconciler(secrets, store);
        let mut binding = SecretBinding::default();
        r.put(&db_config(), &mut binding).await.unwrap();

        assert_eq!(binding.id, "/app/db/password");
        assert_eq!(
            binding.arn.as_deref(),
            Some("arn:aws:ssm:eu-west-2:123456789012:parameter/app/db/password")
        );
        assert_eq!(binding.status(), BindingStatus::PresentVerified);

        r.read(&mut binding).await.unwrap();
        assert_eq!(
            binding.arn.as_deref(),
            Some("arn:aws:ssm:eu-west-2:123456789012:parameter/app/db/password")
        );
    }

    #[tokio::test]
    async fn secret_retrieval_failure_aborts_put_before_any_remote_call() {
        let mut secrets = MockSecretSource::new();
        secrets.expect_fetch().returning(|_, key| {
            Err(SyncError::SecretRetrieval {
                key: key.to_owned(),
                status: "exit status: 1".into(),
                stderr: "not found".into(),
            })
        });
        let mut store = MockParameterStore::new();
        store.expect_put().never();
        store.expect_describe().never();
        store.expect_get().never();
        store.expect_delete().never();

        let r = reconciler(secrets, store);
        let mut binding = SecretBinding::default();
        let err = r.put(&db_config(), &mut binding).await.unwrap_err();

        assert!(matches!(err, SyncError::SecretRetrieval { .. }));
        assert!(err.to_string().contains("not found"));
        assert!(!binding.is_present());
    }

    #[tokio::test]
    async fn exists_never_decrypts() {
        let store = MemoryParameterStore::rejecting_decryption();
        store
            .put(PutParameter::secure_string("/app/db/password", "s3cr3t"))
            .await
            .unwrap();
        let r = reconciler(MockSecretSource::new(), store);

        let binding = SecretBinding::imported("/app/db/password");
        assert!(r.exists(&binding).await.unwrap());
    }

    #[tokio::test]
    async fn exists_maps_not_found_to_false_and_propagates_other_errors() {
        let mut store = MockParameterStore::new();
        store
            .expect_get()
            .withf(|name, decrypt| name == "/gone" && !*decrypt)
            .returning(|name, _| Err(SyncError::RemoteNotFound(name.to_owned())));
        store
            .expect_get()
            .withf(|name, _| name == "/denied")
            .returning(|_, _| Err(SyncError::remote("GetParameter", "AccessDeniedException")));
        let r = reconciler(MockSecretSource::new(), store);

        assert!(!r.exists(&SecretBinding::imported("/gone")).await.unwrap());
        assert!(matches!(
            r.exists(&SecretBinding::imported("/denied")).await,
            Err(SyncError::Remote { .. })
        ));
    }

    #[tokio::test]
    async fn exists_on_absent_binding_makes_no_call() {
        let mut store = MockParameterStore::new();
        store.expect_get().never();
        let r = reconciler(MockSecretSource::new(), store);
        assert!(!r.exists(&SecretBinding::default()).await.unwrap());
    }

    #[tokio::test]
    async fn read_clears_id_when_parameter_is_gone() {
        let mut store = MockParameterStore::new();
        store
            .expect_describe()
            .returning(|name| Err(SyncError::RemoteNotFound(name.to_owned())));
        let r = reconciler(secrets("s3cr3t"), store);

        let mut binding = SecretBinding::from_config(&db_config());
        binding.id = "/app/db/password".into();
        r.read(&mut binding).await.unwrap();

        assert!(binding.id.is_empty());
        assert_eq!(binding.status(), BindingStatus::Absent);
    }

    #[tokio::test]
    async fn read_propagates_other_remote_errors() {
        let mut store = MockParameterStore::new();
        store
            .expect_describe()
            .returning(|_| Err(SyncError::remote("DescribeParameters", "ThrottlingException")));
        let r = reconciler(secrets("s3cr3t"), store);

        let mut binding = SecretBinding::from_config(&db_config());
        binding.id = "/app/db/password".into();
        assert!(r.read(&mut binding).await.is_err());
        assert_eq!(binding.id, "/app/db/password");
    }

    #[tokio::test]
    async fn put_then_read_reflects_description_and_key_id() {
        let r = reconciler(secrets("s3cr3t"), MemoryParameterStore::new());
        let cfg = db_config()
            .with_description("database password")
            .with_key_id("alias/app");

        let mut binding = SecretBinding::default();
        r.put(&cfg, &mut binding).await.unwrap();
        r.read(&mut binding).await.unwrap();

        assert_eq!(binding.description.as_deref(), Some("database password"));
        assert_eq!(binding.key_id.as_deref(), Some("alias/app"));
        assert!(binding.last_modified_in_parameterstore.is_some());
    }

    #[tokio::test]
    async fn update_resends_description_only_when_changed() {
        let mut store = MockParameterStore::new();
        store
            .expect_put()
            .withf(|input| input.description.is_none() && input.key_id.as_deref() == Some("alias/aws/ssm"))
            .times(1)
            .returning(|_| Ok(()));
        store.expect_describe().returning(|name| {
            Ok(ParameterMetadata {
                description: Some("same".into()),
                ..metadata(name)
            })
        });
        let r = reconciler(secrets("s3cr3t"), store);

        let cfg = db_config().with_description("same");
        let mut binding = SecretBinding::from_config(&cfg);
        binding.id = cfg.parameter_name.clone();
        binding.key_id = Some("alias/aws/ssm".into());

        r.put(&cfg, &mut binding).await.unwrap();
        assert_eq!(binding.description.as_deref(), Some("same"));
    }

    #[tokio::test]
    async fn removed_description_is_cleared_remotely() {
        let mut store = MockParameterStore::new();
        store
            .expect_put()
            .withf(|input| input.description.as_deref() == Some(""))
            .times(1)
            .returning(|_| Ok(()));
        store.expect_describe().returning(|name| Ok(metadata(name)));
        let r = reconciler(secrets("s3cr3t"), store);

        let mut binding = SecretBinding::imported("/app/db/password");
        binding.pass_key = "app/db".into();
        binding.description = Some("old".into());

        r.put(&db_config(), &mut binding).await.unwrap();
    }

    #[tokio::test]
    async fn put_overwrites_existing_parameter() {
        let store = MemoryParameterStore::new();
        store
            .put(PutParameter::secure_string("/app/db/password", "stale"))
            .await
            .unwrap();
        let r = reconciler(secrets("s3cr3t"), store);

        let mut binding = SecretBinding::default();
        r.put(&db_config(), &mut binding).await.unwrap();

        assert_eq!(r.store.value_of("/app/db/password").as_deref(), Some("s3cr3t"));
    }

    #[tokio::test]
    async fn delete_then_exists_is_false() {
        let r = reconciler(secrets("s3cr3t"), MemoryParameterStore::new());
        let mut binding = SecretBinding::default();
        r.put(&db_config(), &mut binding).await.unwrap();
        assert!(r.exists(&binding).await.unwrap());

        let name = binding.parameter_name.clone();
        r.delete(&mut binding).await.unwrap();
        assert_eq!(binding.status(), BindingStatus::Absent);
        assert!(!r.exists(&SecretBinding::imported(name)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_surfaces_not_found() {
        let r = reconciler(MockSecretSource::new(), MemoryParameterStore::new());
        let mut binding = SecretBinding::imported("/never/created");
        let err = r.delete(&mut binding).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(binding.is_present());
    }

    #[tokio::test]
    async fn read_keeps_fingerprint_stable_until_secret_changes() {
        let store = MemoryParameterStore::new();
        let mut secrets = MockSecretSource::new();
        let mut seq = mockall::Sequence::new();
        for value in ["s3cr3t", "s3cr3t", "rotated"] {
            secrets
                .expect_fetch()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(SecretValue::from(value)));
        }
        let r = reconciler(secrets, store);

        let mut binding = SecretBinding::default();
        r.put(&db_config(), &mut binding).await.unwrap();
        let first = binding.fingerprint.clone().unwrap();

        r.read(&mut binding).await.unwrap();
        assert_eq!(binding.fingerprint.as_ref(), Some(&first));

        r.read(&mut binding).await.unwrap();
        let third = binding.fingerprint.clone().unwrap();
        assert_eq!(third.salt, first.salt);
        assert_ne!(third.digest, first.digest);
    }

    #[tokio::test]
    async fn persisted_state_never_contains_plaintext() {
        let r = reconciler(secrets("s3cr3t-plaintext"), MemoryParameterStore::new());
        let mut binding = SecretBinding::default();
        r.put(&db_config(), &mut binding).await.unwrap();

        let json = serde_json::to_string(&binding).unwrap();
        assert!(!json.contains("s3cr3t-plaintext"));
    }

    #[tokio::test]
    async fn import_then_read_populates_state() {
        let store = MemoryParameterStore::new();
        let mut input = PutParameter::secure_string("/app/db/password", "s3cr3t");
        input.description = Some("from elsewhere".into());
        store.put(input).await.unwrap();
        let r = reconciler(secrets("s3cr3t"), store);

        let mut binding = r.import("/app/db/password");
        assert_eq!(binding.status(), BindingStatus::PresentUnverified);
        binding.pass_key = "app/db".into();
        r.read(&mut binding).await.unwrap();

        assert_eq!(binding.status(), BindingStatus::PresentVerified);
        assert_eq!(binding.description.as_deref(), Some("from elsewhere"));
        assert!(binding.fingerprint.is_some());
    }

    #[tokio::test]
    async fn read_of_imported_binding_without_pass_key_is_rejected() {
        let mut secrets = MockSecretSource::new();
        secrets.expect_fetch().never();
        let r = reconciler(secrets, MockParameterStore::new());

        let mut binding = SecretBinding::imported("/app/db/password");
        assert!(matches!(
            r.read(&mut binding).await,
            Err(SyncError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn read_of_absent_binding_is_a_no_op() {
        let mut secrets = MockSecretSource::new();
        secrets.expect_fetch().never();
        let r = reconciler(secrets, MockParameterStore::new());

        let mut binding = SecretBinding::from_config(&db_config());
        r.read(&mut binding).await.unwrap();
        assert_eq!(binding, SecretBinding::from_config(&db_config()));
    }
}
