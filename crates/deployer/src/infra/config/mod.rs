use {
    crate::domain::{contract::ContractId, network::NetworkProfile},
    alloy::primitives::Address,
    std::{collections::BTreeMap, path::PathBuf},
};

pub mod file;

/// Configuration of a deployment run, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Compiler version the artifacts have to be built with.
    pub solidity: String,
    pub artifacts: PathBuf,
    pub default_network: String,
    pub contract: Contract,
    pub networks: BTreeMap<String, NetworkProfile>,
}

#[derive(Debug, Clone)]
pub struct Contract {
    pub id: ContractId,
    pub display_name: String,
    pub constructor_args: Vec<String>,
    /// Addresses of already deployed libraries the contract links against.
    pub libraries: BTreeMap<String, Address>,
}

impl Config {
    /// The profile of the named network, or of the default network if no name
    /// is given.
    pub fn profile(&self, name: Option<&str>) -> anyhow::Result<&NetworkProfile> {
        let name = name.unwrap_or(&self.default_network);
        self.networks.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "network {name:?} is not configured, known networks: {:?}",
                self.networks.keys().collect::<Vec<_>>()
            )
        })
    }
}
