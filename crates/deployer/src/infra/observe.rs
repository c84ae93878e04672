//! This module implements the observability for the deployer. It exposes
//! functions which represent events that are meaningful to a deployment run.
//! These functions are called when the corresponding events occur and log
//! them.

use {
    crate::{
        domain::{
            contract::{ContractFactory, ContractId},
            deployment::{self, DeploymentHandle},
            network::{Confirmation, InvalidCredential, NetworkProfile, PendingDeployment, Signer},
        },
        infra::cli,
    },
    alloy::primitives::Address,
    std::path::Path,
};

/// Setup the observability. Logs go to stderr, stdout is reserved for the
/// deployment report.
pub fn init(args: &cli::Args) {
    let config = observe::Config::new(&args.log, args.log_json);
    observe::tracing::initialize(&config);
    tracing::info!("running deployer with validated arguments:\n{args}");
}

/// Observe that the environment file couldn't be loaded.
pub fn env_file_failed(path: &Path, err: &dotenvy::Error) {
    if err.not_found() {
        tracing::debug!(?path, "no environment file");
    } else {
        tracing::warn!(?path, ?err, "failed to load environment file");
    }
}

/// Observe that the built-in configuration is used.
pub fn default_config() {
    tracing::debug!("no config file given, using the built-in configuration");
}

/// Observe that a credential was dropped because it references an unset
/// environment variable.
pub fn unset_credential(network: &str, index: usize, variable: &str) {
    tracing::warn!(
        %network,
        index,
        %variable,
        "dropping account: environment variable is not set"
    );
}

/// Observe that a credential was skipped because it isn't a private key.
pub fn invalid_credential(network: &str, index: usize, err: &InvalidCredential) {
    tracing::warn!(%network, index, %err, "skipping invalid account");
}

/// Observe that the artifacts directory doesn't exist.
pub fn missing_artifacts(dir: &Path) {
    tracing::warn!(?dir, "artifacts directory not found, were the contracts compiled?");
}

/// Observe the artifacts that were found.
pub fn artifacts_loaded(dir: &Path, contracts: &[&ContractId]) {
    tracing::debug!(?dir, ?contracts, "loaded compiled artifacts");
}

/// Observe that an artifact file was skipped.
pub fn skipped_artifact(path: &Path, reason: &str) {
    tracing::trace!(?path, %reason, "skipping artifact");
}

/// Observe that the compiler version of an artifact couldn't be verified.
pub fn unverified_compiler(id: &ContractId, err: &anyhow::Error) {
    tracing::debug!(%id, ?err, "unable to verify compiler version");
}

/// Observe that signer resolution is about to start.
pub fn resolving_signers(network: &NetworkProfile) {
    tracing::debug!(network = %network.name, url = %network.url, "resolving signers");
}

/// Observe the signer that is going to pay for the deployment.
pub fn signer_selected(network: &NetworkProfile, signer: &Signer) {
    let kind = match signer {
        Signer::Local(_) => "local",
        Signer::Remote(_) => "remote",
    };
    tracing::info!(network = %network.name, account = %signer.address(), kind, "selected signer");
}

/// Observe the resolved contract factory.
pub fn factory_resolved(factory: &ContractFactory) {
    tracing::debug!(
        contract = %factory.id,
        bytecode_len = factory.bytecode.len(),
        "resolved contract factory"
    );
}

/// Observe that the deployment transaction is about to be submitted.
pub fn submitting(contract: &ContractId, signer: &Signer, code_len: usize) {
    tracing::debug!(%contract, from = %signer.address(), code_len, "submitting deployment");
}

/// Observe the submitted deployment transaction.
pub fn submitted(pending: &PendingDeployment) {
    tracing::info!(
        tx = %pending.tx_hash,
        from = %pending.from,
        predicted_address = %pending.predicted_address,
        "submitted deployment transaction"
    );
}

/// Observe that the confirmation wait is starting.
pub fn awaiting_confirmation(pending: &PendingDeployment, confirmation: &Confirmation) {
    tracing::debug!(
        tx = %pending.tx_hash,
        confirmations = confirmation.confirmations,
        timeout = ?confirmation.timeout,
        "awaiting confirmation"
    );
}

/// Observe that the contract landed somewhere else than predicted, i.e. the
/// transaction was mined with a different nonce.
pub fn unexpected_address(pending: &PendingDeployment, address: Address) {
    tracing::warn!(
        tx = %pending.tx_hash,
        predicted = %pending.predicted_address,
        actual = %address,
        "contract deployed to an unexpected address"
    );
}

/// Observe the confirmed deployment.
pub fn confirmed(handle: &DeploymentHandle) {
    tracing::info!(contract = %handle.contract, tx = %handle.tx_hash, status = ?handle.status(), "deployment confirmed");
}

/// Observe that the deployment failed.
pub fn deployment_failed(contract: &ContractId, err: &deployment::Error) {
    tracing::error!(%contract, stage = ?err.stage(), ?err, "deployment failed");
}
