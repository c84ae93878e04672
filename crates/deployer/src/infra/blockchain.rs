use {
    crate::domain::network::{
        self,
        Accounts,
        NetworkProfile,
        Node,
        PendingDeployment,
        Receipt,
        Signer,
    },
    alloy::{
        network::{EthereumWallet, TransactionBuilder},
        primitives::Bytes,
        providers::{DynProvider, PendingTransactionConfig, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
    },
    anyhow::{Context, anyhow, ensure},
    url::Url,
};

/// A JSON-RPC node of the selected network.
///
/// Doesn't connect until the first request, so nothing touches the network
/// before a signer is known.
#[derive(Debug, Clone)]
pub struct Ethereum {
    url: Url,
    chain_id: Option<u64>,
}

impl Ethereum {
    pub fn new(profile: &NetworkProfile) -> Self {
        Self {
            url: profile.url.clone(),
            chain_id: profile.chain_id,
        }
    }

    /// A provider that signs locally for local signers and lets the node sign
    /// otherwise.
    fn provider(&self, signer: Option<&Signer>) -> DynProvider {
        match signer {
            Some(Signer::Local(signer)) => ProviderBuilder::new()
                .wallet(EthereumWallet::new(signer.clone()))
                .connect_http(self.url.clone())
                .erased(),
            Some(Signer::Remote(_)) | None => {
                ProviderBuilder::new().connect_http(self.url.clone()).erased()
            }
        }
    }

    async fn verify_chain_id(&self, provider: &DynProvider) -> anyhow::Result<()> {
        let Some(expected) = self.chain_id else {
            return Ok(());
        };
        let actual = provider
            .get_chain_id()
            .await
            .context("failed to fetch chain ID")?;
        ensure!(
            actual == expected,
            "node at {} is on chain {actual}, expected chain {expected}",
            self.url
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Node for Ethereum {
    async fn signers(&self, profile: &NetworkProfile) -> anyhow::Result<Vec<Signer>> {
        match &profile.accounts {
            Accounts::Local(credentials) => Ok(network::local_signers(&profile.name, credentials)),
            Accounts::Remote => Ok(self
                .provider(None)
                .get_accounts()
                .await
                .context("failed to fetch node accounts")?
                .into_iter()
                .map(Signer::Remote)
                .collect()),
        }
    }

    async fn submit_deployment(
        &self,
        code: Bytes,
        signer: &Signer,
    ) -> anyhow::Result<PendingDeployment> {
        let provider = self.provider(Some(signer));
        self.verify_chain_id(&provider).await?;

        let from = signer.address();
        let nonce = provider
            .get_transaction_count(from)
            .pending()
            .await
            .context("failed to fetch nonce")?;
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_nonce(nonce)
            .with_deploy_code(code);
        let pending = provider
            .send_transaction(tx)
            .await
            .context("failed to send transaction")?;

        Ok(PendingDeployment {
            tx_hash: *pending.tx_hash(),
            from,
            predicted_address: from.create(nonce),
        })
    }

    async fn await_confirmation(
        &self,
        pending: &PendingDeployment,
        confirmations: u64,
    ) -> anyhow::Result<Receipt> {
        let provider = self.provider(None);
        let config = PendingTransactionConfig::new(pending.tx_hash)
            .with_required_confirmations(confirmations);
        let tx_hash = provider
            .watch_pending_transaction(config)
            .await
            .context("failed to watch transaction")?
            .await
            .context("failed to confirm transaction")?;
        let receipt = provider
            .get_transaction_receipt(tx_hash)
            .await
            .context("failed to fetch receipt")?
            .ok_or_else(|| anyhow!("no receipt for confirmed transaction {tx_hash}"))?;

        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success: receipt.status(),
            contract_address: receipt.contract_address,
        })
    }
}
