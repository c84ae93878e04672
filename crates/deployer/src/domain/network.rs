//! Network profiles and the accounts that can sign deployments on them.

use {
    crate::infra::observe,
    alloy::{
        primitives::{Address, B256, Bytes},
        signers::local::PrivateKeySigner,
    },
    std::{fmt, time::Duration},
    url::Url,
};

/// A named deployment target. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub name: String,
    pub url: Url,
    pub accounts: Accounts,
    /// When set, the node has to report this chain ID before anything gets
    /// submitted to it.
    pub chain_id: Option<u64>,
    pub confirmation: Confirmation,
}

/// Where the signing accounts of a network come from.
#[derive(Debug, Clone)]
pub enum Accounts {
    /// Private keys held by this process, in the configured order.
    Local(Vec<Credential>),
    /// Accounts unlocked on the node. The node signs on our behalf.
    Remote,
}

/// How long and how deep to wait for the deployment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Upper bound for the confirmation wait. `None` waits for as long as the
    /// node client does.
    pub timeout: Option<Duration>,
    /// Number of blocks (including the one with the transaction) required
    /// before the deployment counts as confirmed.
    pub confirmations: u64,
}

impl Default for Confirmation {
    fn default() -> Self {
        Self {
            timeout: None,
            confirmations: 1,
        }
    }
}

/// A configured private key.
///
/// Has a custom `Debug` impl so the key never ends up in logs.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn signer(&self) -> Result<PrivateKeySigner, InvalidCredential> {
        self.0.trim().parse().map_err(|_| InvalidCredential)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(SECRET)")
    }
}

// Must not carry the underlying parse error, it can contain key material.
#[derive(Debug, thiserror::Error)]
#[error("credential is not a 32-byte hex encoded private key")]
pub struct InvalidCredential;

/// An account capable of submitting the deployment transaction.
#[derive(Debug, Clone)]
pub enum Signer {
    Local(PrivateKeySigner),
    Remote(Address),
}

impl Signer {
    pub fn address(&self) -> Address {
        match self {
            Self::Local(signer) => signer.address(),
            Self::Remote(address) => *address,
        }
    }
}

/// A submitted but not yet confirmed deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub tx_hash: B256,
    pub from: Address,
    /// Where the contract lands if the transaction is mined with the nonce it
    /// was submitted with.
    pub predicted_address: Address,
}

/// The outcome of a mined deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
    pub contract_address: Option<Address>,
}

/// The network collaborator, i.e. a node of the selected network.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Node: Send + Sync {
    /// Signers available on the given network, in order of preference.
    async fn signers(&self, profile: &NetworkProfile) -> anyhow::Result<Vec<Signer>>;

    /// Sends a single contract creation transaction with `code` as input,
    /// signed by `signer`.
    async fn submit_deployment(
        &self,
        code: Bytes,
        signer: &Signer,
    ) -> anyhow::Result<PendingDeployment>;

    /// Waits until the transaction is mined and buried under the requested
    /// number of confirmations.
    async fn await_confirmation(
        &self,
        pending: &PendingDeployment,
        confirmations: u64,
    ) -> anyhow::Result<Receipt>;
}

/// Parses the credentials in their configured order. Credentials that are not
/// valid private keys are skipped.
pub fn local_signers(network: &str, credentials: &[Credential]) -> Vec<Signer> {
    credentials
        .iter()
        .enumerate()
        .filter_map(|(index, credential)| match credential.signer() {
            Ok(signer) => Some(Signer::Local(signer)),
            Err(err) => {
                observe::invalid_credential(network, index, &err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address};

    // First default account of anvil and hardhat dev nodes.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn parses_private_key_with_and_without_prefix() {
        let prefixed = Credential::new(DEV_KEY).signer().unwrap();
        let bare = Credential::new(DEV_KEY.trim_start_matches("0x"))
            .signer()
            .unwrap();
        assert_eq!(prefixed.address(), DEV_ADDRESS);
        assert_eq!(bare.address(), DEV_ADDRESS);
    }

    #[test]
    fn skips_invalid_credentials_and_keeps_order() {
        let second = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
        let signers = local_signers(
            "localhost",
            &[
                Credential::new(""),
                Credential::new("undefined"),
                Credential::new(DEV_KEY),
                Credential::new(second),
            ],
        );
        let addresses = signers.iter().map(Signer::address).collect::<Vec<_>>();
        assert_eq!(
            addresses,
            vec![
                DEV_ADDRESS,
                address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
            ]
        );
    }

    #[test]
    fn no_valid_credentials_yield_no_signers() {
        assert!(local_signers("sepolia", &[Credential::new("0x1234")]).is_empty());
        assert!(local_signers("sepolia", &[]).is_empty());
    }

    #[test]
    fn debug_output_hides_key() {
        let debug = format!("{:?}", Credential::new(DEV_KEY));
        assert!(!debug.contains("ac0974"));
    }

    #[test]
    fn remote_signer_reports_its_address() {
        assert_eq!(Signer::Remote(DEV_ADDRESS).address(), DEV_ADDRESS);
    }
}
