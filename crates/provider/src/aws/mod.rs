//! AWS integration: SDK clients, caller identity, and the SSM-backed store.
//!
//! Lifecycle code never touches the SDK directly; it goes through the
//! [`ParameterStore`] trait so that tests can substitute their own store.

pub mod clients;
pub mod identity;
pub mod ssm;
pub mod store;

pub use clients::AwsClients;
pub use ssm::SsmParameterStore;
pub use store::{ParameterStore, PutParameter};
