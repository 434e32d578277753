//! Configuration loading and validation for `pass-ssm-sync`.
//!
//! All values are read from `PASS_SSM_*` environment variables at startup. The
//! process exits with a clear error message if any value is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix shared by every configuration variable (`PASS_SSM_REGION`, ...).
pub const ENV_PREFIX: &str = "PASS_SSM";

/// Validated provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// AWS region. Falls back to the SDK's default chain (`AWS_REGION`,
    /// shared config) when unset.
    #[serde(default)]
    pub region: Option<String>,

    /// Named profile from the shared AWS config files.
    #[serde(default)]
    pub profile: Option<String>,

    /// Custom SSM endpoint URL (e.g. a VPC endpoint or a local emulator).
    #[serde(default)]
    pub ssm_endpoint: Option<String>,

    /// Comma-separated account ids the provider may operate in.
    #[serde(default)]
    pub allowed_account_ids: Option<String>,

    /// Comma-separated account ids the provider must refuse to operate in.
    #[serde(default)]
    pub forbidden_account_ids: Option<String>,

    /// Skip the region name check.
    #[serde(default)]
    pub skip_region_validation: bool,

    /// Skip the STS caller-identity lookup. ARNs then carry an empty account id.
    #[serde(default)]
    pub skip_requesting_account_id: bool,

    /// Maximum SDK-level retries per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Executable invoked to read secrets.
    #[serde(default = "default_pass_binary")]
    pub pass_binary: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}
fn default_pass_binary() -> String {
    "pass".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Parsed `allowed_account_ids`.
    pub fn allowed_accounts(&self) -> Vec<String> {
        split_ids(self.allowed_account_ids.as_deref())
    }

    /// Parsed `forbidden_account_ids`.
    pub fn forbidden_accounts(&self) -> Vec<String> {
        split_ids(self.forbidden_account_ids.as_deref())
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if let Some(region) = &self.region {
            if !self.skip_region_validation && !is_valid_region(region) {
                anyhow::bail!("PASS_SSM_REGION {region:?} is not a valid AWS region name");
            }
        }
        if !self.allowed_accounts().is_empty() && !self.forbidden_accounts().is_empty() {
            anyhow::bail!(
                "PASS_SSM_ALLOWED_ACCOUNT_IDS and PASS_SSM_FORBIDDEN_ACCOUNT_IDS are mutually exclusive"
            );
        }
        if self.pass_binary.trim().is_empty() {
            anyhow::bail!("PASS_SSM_PASS_BINARY must not be empty");
        }
        if let Some(endpoint) = &self.ssm_endpoint {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                anyhow::bail!("PASS_SSM_SSM_ENDPOINT must be an http(s) URL");
            }
        }
        Ok(())
    }
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Shape check for region names such as `eu-west-2`, `us-gov-west-1`,
/// `cn-north-1` or `ap-southeast-4`.
pub fn is_valid_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    let geo = rest[0];
    geo.len() == 2
        && geo.chars().all(|c| c.is_ascii_lowercase())
        && rest[1..]
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
        && !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
}
