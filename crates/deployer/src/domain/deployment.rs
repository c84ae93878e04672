//! Drives a single contract deployment from signer resolution to the
//! confirmed contract address.
//!
//! A run moves through the stages
//! `Idle → SignerResolved → FactoryResolved → Submitted → Confirmed`.
//! Any failure ends the run in the stage it reached, nothing is retried and
//! there is no partially successful outcome.

use {
    super::{
        contract::{ArtifactError, Build, ConstructorError, ContractId},
        network::{NetworkProfile, Node, PendingDeployment},
    },
    crate::infra::observe,
    alloy::primitives::{Address, B256},
    std::{
        fmt,
        io::{self, Write},
        time::Duration,
    },
};

/// Everything describing one deployment run.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub network: NetworkProfile,
    pub contract: ContractId,
    /// Name used when reporting the deployed address.
    pub display_name: String,
    pub constructor_args: Vec<String>,
}

/// Progress of a deployment run. A failed run is an [`Error`], which reports
/// the last stage reached through [`Error::stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    SignerResolved,
    FactoryResolved,
    Submitted,
    Confirmed,
}

/// The record of one deployment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentHandle {
    pub contract: ContractId,
    pub deployer: Address,
    pub tx_hash: B256,
    status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending {
        predicted_address: Address,
    },
    Confirmed {
        address: Address,
        block_number: Option<u64>,
    },
}

impl DeploymentHandle {
    fn pending(contract: ContractId, pending: &PendingDeployment) -> Self {
        Self {
            contract,
            deployer: pending.from,
            tx_hash: pending.tx_hash,
            status: Status::Pending {
                predicted_address: pending.predicted_address,
            },
        }
    }

    /// Consumes the pending handle, confirmed handles can't change anymore.
    fn confirm(self, address: Address, block_number: Option<u64>) -> Self {
        Self {
            status: Status::Confirmed {
                address,
                block_number,
            },
            ..self
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn stage(&self) -> Stage {
        match self.status {
            Status::Pending { .. } => Stage::Submitted,
            Status::Confirmed { .. } => Stage::Confirmed,
        }
    }

    /// The on-chain address of the deployed contract, only known once the
    /// deployment is confirmed.
    pub fn address(&self) -> Option<Address> {
        match self.status {
            Status::Pending { .. } => None,
            Status::Confirmed { address, .. } => Some(address),
        }
    }
}

pub struct Orchestrator<'a> {
    node: &'a dyn Node,
    build: &'a dyn Build,
}

impl<'a> Orchestrator<'a> {
    pub fn new(node: &'a dyn Node, build: &'a dyn Build) -> Self {
        Self { node, build }
    }

    /// Deploys the contract exactly once.
    ///
    /// The deploying account and the final contract address are reported to
    /// `out` as they become known.
    pub async fn deploy(
        &self,
        deployment: &Deployment,
        out: &mut impl Write,
    ) -> Result<DeploymentHandle, Error> {
        let result = self.run(deployment, out).await;
        if let Err(err) = &result {
            observe::deployment_failed(&deployment.contract, err);
        }
        result
    }

    async fn run(
        &self,
        deployment: &Deployment,
        out: &mut impl Write,
    ) -> Result<DeploymentHandle, Error> {
        let network = &deployment.network;

        observe::resolving_signers(network);
        let signer = self
            .node
            .signers(network)
            .await
            .map_err(Error::SignerResolution)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoSignerAvailable {
                network: network.name.clone(),
            })?;
        observe::signer_selected(network, &signer);
        report(
            out,
            format_args!(
                "Deploying contracts with the account: {}",
                signer.address()
            ),
        )
        .map_err(|err| Error::Report {
            stage: Stage::SignerResolved,
            err,
        })?;

        let factory = self.build.factory(&deployment.contract)?;
        observe::factory_resolved(&factory);
        let code = factory
            .deploy_code(&deployment.constructor_args)
            .map_err(|err| Error::ConstructorArgs {
                contract: deployment.contract.clone(),
                err,
            })?;

        observe::submitting(&deployment.contract, &signer, code.len());
        let pending = self
            .node
            .submit_deployment(code, &signer)
            .await
            .map_err(Error::Submission)?;
        observe::submitted(&pending);
        let handle = DeploymentHandle::pending(deployment.contract.clone(), &pending);

        let confirmation = network.confirmation;
        observe::awaiting_confirmation(&pending, &confirmation);
        let wait = self
            .node
            .await_confirmation(&pending, confirmation.confirmations);
        let receipt = match confirmation.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait).await.map_err(|_| {
                Error::ConfirmationTimeout {
                    tx: pending.tx_hash,
                    timeout,
                }
            })?,
            None => wait.await,
        }
        .map_err(|err| Error::Confirmation {
            tx: pending.tx_hash,
            err,
        })?;

        if !receipt.success {
            return Err(Error::TransactionReverted {
                tx: receipt.tx_hash,
            });
        }
        let address = receipt
            .contract_address
            .ok_or(Error::MissingContractAddress {
                tx: receipt.tx_hash,
            })?;
        if address != pending.predicted_address {
            observe::unexpected_address(&pending, address);
        }

        let handle = handle.confirm(address, receipt.block_number);
        observe::confirmed(&handle);
        report(
            out,
            format_args!("{} deployed to: {address}", deployment.display_name),
        )
        .map_err(|err| Error::Report {
            stage: Stage::Confirmed,
            err,
        })?;
        Ok(handle)
    }
}

fn report(out: &mut impl Write, line: fmt::Arguments<'_>) -> io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no signer available for network {network:?}, is a valid private key configured?")]
    NoSignerAvailable { network: String },
    #[error("failed to resolve signers: {0:#}")]
    SignerResolution(anyhow::Error),
    #[error(transparent)]
    ArtifactNotFound(#[from] ArtifactError),
    #[error("invalid constructor arguments for {contract}: {err}")]
    ConstructorArgs {
        contract: ContractId,
        err: ConstructorError,
    },
    #[error("failed to submit deployment transaction: {0:#}")]
    Submission(anyhow::Error),
    #[error("deployment transaction {tx} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx: B256, timeout: Duration },
    #[error("deployment transaction {tx} reverted")]
    TransactionReverted { tx: B256 },
    #[error("failed to confirm deployment transaction {tx}: {err:#}")]
    Confirmation { tx: B256, err: anyhow::Error },
    #[error("receipt of deployment transaction {tx} has no contract address")]
    MissingContractAddress { tx: B256 },
    #[error("failed to write deployment report: {err}")]
    Report { stage: Stage, err: io::Error },
}

impl Error {
    /// The last stage the run reached before failing.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NoSignerAvailable { .. } | Self::SignerResolution(_) => Stage::Idle,
            Self::ArtifactNotFound(_) => Stage::SignerResolved,
            Self::ConstructorArgs { .. } | Self::Submission(_) => Stage::FactoryResolved,
            Self::ConfirmationTimeout { .. }
            | Self::TransactionReverted { .. }
            | Self::Confirmation { .. }
            | Self::MissingContractAddress { .. } => Stage::Submitted,
            Self::Report { stage, .. } => *stage,
        }
    }
}
