//! In-memory [`RpcConnection`] for exercising transaction flows without a
//! validator. Transactions are recorded, never executed.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::{Transaction, TransactionError},
};
use solana_transaction_status::{TransactionConfirmationStatus, TransactionStatus};

use crate::rpc::{errors::RpcError, rpc_connection::RpcConnection, RpcConnectionConfig};

#[derive(Debug)]
pub struct TestRpc {
    url: String,
    blockhash: Hash,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    statuses: Mutex<HashMap<Signature, TransactionStatus>>,
    accepted: Mutex<Vec<Transaction>>,
    send_failures: Mutex<VecDeque<RpcError>>,
    calls: Mutex<Vec<&'static str>>,
    /// Status assigned to every accepted transaction. `None` leaves it
    /// unknown to `get_signature_statuses`.
    landing_status: Mutex<Option<TransactionStatus>>,
}

impl TestRpc {
    pub fn new_with_blockhash(blockhash: Hash) -> Self {
        Self {
            url: "test-rpc".to_string(),
            blockhash,
            accounts: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            accepted: Mutex::new(Vec::new()),
            send_failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            landing_status: Mutex::new(Some(Self::status(
                TransactionConfirmationStatus::Confirmed,
            ))),
        }
    }

    pub fn status(level: TransactionConfirmationStatus) -> TransactionStatus {
        let confirmations = match level {
            TransactionConfirmationStatus::Finalized => None,
            TransactionConfirmationStatus::Confirmed => Some(1),
            TransactionConfirmationStatus::Processed => Some(0),
        };
        TransactionStatus {
            slot: 1,
            confirmations,
            status: Ok(()),
            err: None,
            confirmation_status: Some(level),
        }
    }

    pub fn failed_status(err: TransactionError) -> TransactionStatus {
        TransactionStatus {
            slot: 1,
            confirmations: Some(0),
            status: Err(err.clone()),
            err: Some(err),
            confirmation_status: Some(TransactionConfirmationStatus::Processed),
        }
    }

    pub fn set_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().remove(address);
    }

    pub fn set_landing_status(&self, status: Option<TransactionStatus>) {
        *self.landing_status.lock().unwrap() = status;
    }

    pub fn set_signature_status(&self, signature: Signature, status: TransactionStatus) {
        self.statuses.lock().unwrap().insert(signature, status);
    }

    pub fn push_send_failure(&self, error: RpcError) {
        self.send_failures.lock().unwrap().push_back(error);
    }

    /// Transactions the ledger accepted, in submission order.
    pub fn accepted_transactions(&self) -> Vec<Transaction> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for TestRpc {
    fn default() -> Self {
        Self::new_with_blockhash(Hash::new_unique())
    }
}

#[async_trait]
impl RpcConnection for TestRpc {
    fn new(config: RpcConnectionConfig) -> Self
    where
        Self: Sized,
    {
        Self {
            url: config.url,
            ..Default::default()
        }
    }

    fn get_url(&self) -> String {
        self.url.clone()
    }

    async fn health(&self) -> Result<(), RpcError> {
        self.record("health");
        Ok(())
    }

    async fn get_account(&self, address: Pubkey) -> Result<Option<Account>, RpcError> {
        self.record("get_account");
        Ok(self.accounts.lock().unwrap().get(&address).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.record("get_latest_blockhash");
        Ok(self.blockhash)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        self.record("send_transaction");
        if let Some(error) = self.send_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let signature = *transaction
            .signatures
            .first()
            .ok_or_else(|| RpcError::CustomError("transaction is not signed".to_string()))?;
        let mut accepted = self.accepted.lock().unwrap();
        if accepted.iter().any(|tx| tx.signatures.first() == Some(&signature)) {
            return Err(RpcError::from(TransactionError::AlreadyProcessed));
        }
        accepted.push(transaction.clone());
        if let Some(status) = self.landing_status.lock().unwrap().clone() {
            self.statuses
                .lock()
                .unwrap()
                .entry(signature)
                .or_insert(status);
        }
        Ok(signature)
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<TransactionStatus>>, RpcError> {
        self.record("get_signature_statuses");
        let statuses = self.statuses.lock().unwrap();
        Ok(signatures
            .iter()
            .map(|signature| statuses.get(signature).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::{
        signature::{Keypair, Signer},
        system_instruction,
    };

    use super::*;

    fn transfer_transaction(payer: &Keypair, blockhash: Hash) -> Transaction {
        let instruction = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        Transaction::new_signed_with_payer(
            &[instruction],
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        )
    }

    #[tokio::test]
    async fn test_second_identical_send_is_already_processed() {
        let rpc = TestRpc::default();
        let payer = Keypair::new();
        let blockhash = rpc.get_latest_blockhash().await.unwrap();
        let transaction = transfer_transaction(&payer, blockhash);

        let signature = rpc.send_transaction(&transaction).await.unwrap();
        let err = rpc.send_transaction(&transaction).await.unwrap_err();

        assert!(err.is_already_processed());
        assert_eq!(rpc.accepted_transactions().len(), 1);
        let status = rpc.get_signature_status(&signature).await.unwrap();
        assert_eq!(
            status.and_then(|s| s.confirmation_status),
            Some(TransactionConfirmationStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_queued_send_failure_is_returned_first() {
        let rpc = TestRpc::default();
        rpc.push_send_failure(RpcError::CustomError("node unreachable".to_string()));
        let payer = Keypair::new();
        let transaction = transfer_transaction(&payer, Hash::new_unique());

        assert!(rpc.send_transaction(&transaction).await.is_err());
        assert!(rpc.send_transaction(&transaction).await.is_ok());
        assert_eq!(rpc.calls(), vec!["send_transaction", "send_transaction"]);
    }
}
