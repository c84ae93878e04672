pub mod contract;
pub mod deployment;
pub mod network;

pub use {
    contract::{Build, ContractFactory, ContractId},
    deployment::{Deployment, DeploymentHandle, Orchestrator},
    network::{NetworkProfile, Node, Signer},
};
