//! [`ParameterStore`] backed by AWS Systems Manager Parameter Store.

use async_trait::async_trait;
use aws_sdk_ssm::error::SdkError;
use aws_sdk_ssm::primitives::DateTime;
use aws_sdk_ssm::types::{ParameterStringFilter, ParameterType};
use aws_smithy_types::date_time::Format;
use common::SyncError;
use tracing::debug;

use super::store::{ParameterMetadata, ParameterStore, PutParameter, RemoteParameter};

/// SSM client wrapper translating SDK errors into [`SyncError`].
#[derive(Clone, Debug)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get(&self, name: &str, with_decryption: bool) -> Result<RemoteParameter, SyncError> {
        debug!(name, with_decryption, "GetParameter");
        let resp = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|e| classify(name, "GetParameter", e, |se| se.is_parameter_not_found()))?;

        let p = resp
            .parameter()
            .ok_or_else(|| SyncError::RemoteNotFound(name.to_owned()))?;

        Ok(RemoteParameter {
            name: p.name().unwrap_or(name).to_owned(),
            parameter_type: p.r#type().map(|t| t.as_str().to_owned()),
            version: p.version(),
            last_modified: p.last_modified_date().and_then(format_timestamp),
        })
    }

    async fn describe(&self, name: &str) -> Result<ParameterMetadata, SyncError> {
        debug!(name, "DescribeParameters");
        let filter = ParameterStringFilter::builder()
            .key("Name")
            .option("Equals")
            .values(name)
            .build()
            .map_err(|e| SyncError::remote("DescribeParameters", e))?;

        // DescribeParameters may return an empty page with a NextToken even
        // when the filter matches, so only an exhausted listing means absent.
        let mut pages = self
            .client
            .describe_parameters()
            .parameter_filters(filter)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| SyncError::remote("DescribeParameters", e))?;
            if let Some(m) = page.parameters().first() {
                return Ok(metadata_from_sdk(m, name));
            }
        }
        Err(SyncError::RemoteNotFound(name.to_owned()))
    }

    async fn put(&self, input: PutParameter) -> Result<(), SyncError> {
        debug!(name = %input.name, "PutParameter");
        self.client
            .put_parameter()
            .name(&input.name)
            .value(input.value.as_str())
            .r#type(ParameterType::from(input.parameter_type))
            .overwrite(input.overwrite)
            .set_key_id(input.key_id.clone())
            .set_description(input.description.clone())
            .send()
            .await
            .map_err(|e| SyncError::remote("PutParameter", e))?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), SyncError> {
        debug!(name, "DeleteParameter");
        self.client
            .delete_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| classify(name, "DeleteParameter", e, |se| se.is_parameter_not_found()))?;
        Ok(())
    }
}

/// Map an SDK failure to [`SyncError`], singling out the service's not-found error.
fn classify<E, R>(
    name: &str,
    operation: &'static str,
    err: SdkError<E, R>,
    is_not_found: impl Fn(&E) -> bool,
) -> SyncError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if err.as_service_error().is_some_and(is_not_found) {
        return SyncError::RemoteNotFound(name.to_owned());
    }
    SyncError::remote(operation, err)
}

fn metadata_from_sdk(m: &aws_sdk_ssm::types::ParameterMetadata, requested: &str) -> ParameterMetadata {
    ParameterMetadata {
        name: m.name().unwrap_or(requested).to_owned(),
        parameter_type: m.r#type().map(|t| t.as_str().to_owned()),
        key_id: m.key_id().map(str::to_owned),
        description: m.description().map(str::to_owned),
        last_modified: m.last_modified_date().and_then(format_timestamp),
    }
}

/// RFC 3339 rendering of a service timestamp.
fn format_timestamp(dt: &DateTime) -> Option<String> {
    dt.fmt(Format::DateTime).ok()
}
