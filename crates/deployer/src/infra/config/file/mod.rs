pub use load::{load, parse};
use {
    alloy::primitives::Address,
    serde::Deserialize,
    std::{collections::BTreeMap, path::PathBuf, time::Duration},
};

mod load;

/// The configuration used when no config file is given. Mirrors the Hardhat
/// project the contracts are compiled in.
pub const DEFAULT: &str = r#"
solidity = "0.8.28"
artifacts = "artifacts"
default-network = "localhost"

[contract]
name = "AuctionManager"
display-name = "Auction"

[networks.localhost]
url = "http://localhost:8545"
accounts = ["${PRIVATE_KEY}"]

[networks.sepolia]
url = "https://sepolia.gateway.tenderly.co"
accounts = ["${PRIVATE_KEY}"]
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// The solc version the artifacts are expected to be compiled with.
    solidity: String,

    /// Directory with the compiled artifacts. Relative paths are resolved
    /// against the directory of the config file.
    #[serde(default = "default_artifacts")]
    artifacts: PathBuf,

    /// The network used when none is selected on the command line.
    default_network: String,

    /// The contract to deploy.
    #[serde(default)]
    contract: ContractConfig,

    /// Deployment targets by name.
    networks: BTreeMap<String, NetworkConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ContractConfig {
    /// Bare or fully qualified (`contracts/Name.sol:Name`) contract name.
    #[serde(default = "default_contract_name")]
    name: String,

    /// Name the deployed address is reported under.
    #[serde(default = "default_display_name")]
    display_name: String,

    /// Constructor arguments. Each one is coerced into the type the
    /// constructor declares for it.
    #[serde(default)]
    constructor_args: Vec<String>,

    /// Addresses of deployed libraries to link, by library name.
    #[serde(default)]
    libraries: BTreeMap<String, Address>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            name: default_contract_name(),
            display_name: default_display_name(),
            constructor_args: Default::default(),
            libraries: Default::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct NetworkConfig {
    /// JSON-RPC endpoint. May reference environment variables as `${NAME}`.
    url: String,

    /// Private keys, which may reference environment variables as `${NAME}`,
    /// or `"remote"` to use the accounts unlocked on the node.
    #[serde(default)]
    accounts: AccountsConfig,

    /// Chain ID the node has to report before anything gets submitted.
    chain_id: Option<u64>,

    /// Number of blocks required for a deployment to count as confirmed.
    #[serde(default = "default_confirmations")]
    confirmations: u64,

    /// Maximum time to wait for confirmation.
    #[serde(default, with = "humantime_serde")]
    confirmation_timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountsConfig {
    Remote(RemoteAccounts),
    Local(Vec<String>),
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self::Remote(RemoteAccounts::Remote)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RemoteAccounts {
    Remote,
}

fn default_artifacts() -> PathBuf {
    "artifacts".into()
}

fn default_contract_name() -> String {
    "AuctionManager".to_string()
}

fn default_display_name() -> String {
    "Auction".to_string()
}

fn default_confirmations() -> u64 {
    1
}
