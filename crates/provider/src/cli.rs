//! Command-line surface: one subcommand per lifecycle operation.
//!
//! Every command except `lookup` works on a binding document (see
//! [`crate::document`]) and, where the state changes, writes it back. Results
//! are printed to stdout as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use common::SecretBinding;
use serde_json::{json, Value};
use tracing::info;

use crate::aws::ParameterStore;
use crate::document::BindingDocument;
use crate::pass::SecretSource;
use crate::resource::ParameterFromPass;

#[derive(Debug, Parser)]
#[command(
    name = "pass-ssm-sync",
    version,
    about = "Publish a pass secret as an SSM SecureString parameter"
)]
pub struct Cli {
    /// Binding document holding the declared config and persisted state.
    #[arg(long, short, env = "PASS_SSM_BINDING", default_value = "binding.json")]
    pub binding: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Check whether the tracked parameter still exists.
    Exists,
    /// Refresh state from pass and SSM.
    Read,
    /// Write the secret for a binding that has not been created yet.
    Create,
    /// Rewrite the secret and metadata of an existing binding.
    Update,
    /// Delete the parameter and mark the binding absent.
    Delete,
    /// Adopt an existing parameter into the binding document.
    Import { name: String },
    /// Show name, type and ARN of any parameter without decrypting it.
    Lookup { name: String },
}

/// Run `command` against the document at `binding_path`.
///
/// # Errors
///
/// Document I/O errors, config errors and any lifecycle error. State is only
/// written back after the operation succeeds.
pub async fn execute<S: SecretSource, P: ParameterStore>(
    command: &Command,
    binding_path: &Path,
    reconciler: &ParameterFromPass<S, P>,
) -> Result<Value> {
    if let Command::Lookup { name } = command {
        return Ok(serde_json::to_value(reconciler.lookup(name).await?)?);
    }

    let mut doc = BindingDocument::load(binding_path).await?;
    match command {
        Command::Exists => {
            let exists = reconciler.exists(&doc.state).await?;
            return Ok(json!({ "id": doc.state.id, "exists": exists }));
        }
        Command::Read => reconciler.read(&mut doc.state).await?,
        Command::Create | Command::Update => {
            if doc.config.requires_replacement(&doc.state) {
                bail!(
                    "parameter_name changed from {} to {}; delete the binding and create it again",
                    doc.state.parameter_name,
                    doc.config.parameter_name
                );
            }
            if *command == Command::Create && doc.state.is_present() {
                info!(id = %doc.state.id, "binding already present; overwriting");
            }
            reconciler.put(&doc.config, &mut doc.state).await?;
        }
        Command::Delete => reconciler.delete(&mut doc.state).await?,
        Command::Import { name } => {
            doc.state = imported_state(reconciler.import(name), &doc);
            reconciler.read(&mut doc.state).await?;
        }
        Command::Lookup { .. } => unreachable!("handled above"),
    }

    doc.save(binding_path).await?;
    Ok(state_output(&doc.state))
}

// The pass location is not recorded remotely, so an import takes it from the
// declared config.
fn imported_state(mut state: SecretBinding, doc: &BindingDocument) -> SecretBinding {
    state.pass_key = doc.config.pass_key.clone();
    state.pass_dir = doc.config.pass_dir.clone();
    state
}

fn state_output(state: &SecretBinding) -> Value {
    json!({ "status": state.status(), "state": state })
}
