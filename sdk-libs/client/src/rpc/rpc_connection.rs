use std::fmt::Debug;

use async_trait::async_trait;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::Transaction,
};
use solana_transaction_status::TransactionStatus;

use crate::rpc::{errors::RpcError, solana_rpc::RetryConfig};

#[derive(Debug, Clone)]
pub struct RpcConnectionConfig {
    pub url: String,
    pub commitment_config: Option<CommitmentConfig>,
    pub retry_config: Option<RetryConfig>,
}

impl RpcConnectionConfig {
    pub fn local_no_retries() -> Self {
        Self {
            url: "http://localhost:8899".to_string(),
            commitment_config: Some(CommitmentConfig::processed()),
            retry_config: Some(RetryConfig::no_retries()),
        }
    }
}

#[async_trait]
pub trait RpcConnection: Send + Sync + Debug + 'static {
    fn new(config: RpcConnectionConfig) -> Self
    where
        Self: Sized;

    fn get_url(&self) -> String;

    async fn health(&self) -> Result<(), RpcError>;

    async fn get_account(&self, address: Pubkey) -> Result<Option<Account>, RpcError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Submits the transaction once. Ledger-level rejections come back as
    /// [`RpcError::TransactionError`].
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError>;

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<TransactionStatus>>, RpcError>;

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, RpcError> {
        let mut statuses = self.get_signature_statuses(&[*signature]).await?;
        Ok(statuses.pop().flatten())
    }
}
