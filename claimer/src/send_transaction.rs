use puf_client::rpc::RpcConnection;
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature, transaction::Transaction};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::{
    config::ConfirmConfig,
    errors::{submission_error, ClaimError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The node accepted the transaction; it still has to be confirmed.
    Submitted(Signature),
    /// An identical transaction landed earlier and is already confirmed.
    AlreadyLanded(Signature),
}

impl SubmitOutcome {
    pub fn signature(&self) -> Signature {
        match self {
            SubmitOutcome::Submitted(signature) | SubmitOutcome::AlreadyLanded(signature) => {
                *signature
            }
        }
    }
}

/// Sends a signed transaction exactly once.
///
/// If the node reports it as already processed, the earlier landing is
/// accepted as this call's result when it is at least `confirmed`.
/// Otherwise the original send error is returned.
pub async fn submit_transaction<R: RpcConnection>(
    rpc: &R,
    transaction: &Transaction,
) -> Result<SubmitOutcome, ClaimError> {
    let signature = transaction.signatures.first().copied().unwrap_or_default();
    match rpc.send_transaction(transaction).await {
        Ok(signature) => Ok(SubmitOutcome::Submitted(signature)),
        Err(error) if error.is_already_processed() => {
            warn!(
                "Transaction {} already processed, checking earlier submission",
                signature
            );
            match rpc.get_signature_status(&signature).await {
                Ok(Some(status))
                    if status.err.is_none()
                        && status.satisfies_commitment(CommitmentConfig::confirmed()) =>
                {
                    Ok(SubmitOutcome::AlreadyLanded(signature))
                }
                Ok(status) => {
                    debug!("Earlier submission status: {:?}", status);
                    Err(ClaimError::DuplicateSubmission {
                        signature,
                        source: error,
                    })
                }
                Err(lookup_error) => {
                    warn!(
                        "Failed to look up status of {}: {}",
                        signature, lookup_error
                    );
                    Err(ClaimError::DuplicateSubmission {
                        signature,
                        source: error,
                    })
                }
            }
        }
        Err(error) => Err(submission_error(signature, error)),
    }
}

/// Polls the signature status until it reaches `config.commitment`, the
/// ledger reports a failure, or `config.timeout` elapses.
pub async fn await_confirmation<R: RpcConnection>(
    rpc: &R,
    signature: &Signature,
    config: &ConfirmConfig,
) -> Result<(), ClaimError> {
    let deadline = Instant::now() + config.timeout;
    loop {
        if let Some(status) = rpc.get_signature_status(signature).await? {
            if let Some(error) = status.err {
                return Err(ClaimError::LedgerRejection {
                    signature: *signature,
                    error,
                });
            }
            if status.satisfies_commitment(config.commitment) {
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            return Err(ClaimError::ConfirmationTimeout {
                signature: *signature,
                timeout: config.timeout,
            });
        }
        sleep(config.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use puf_client::rpc::{RpcError, TestRpc};
    use solana_sdk::{
        hash::Hash,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
        system_instruction,
        transaction::TransactionError,
    };
    use solana_transaction_status::TransactionConfirmationStatus;

    use super::*;

    fn signed_transaction() -> Transaction {
        let payer = Keypair::new();
        let instruction = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        Transaction::new_signed_with_payer(
            &[instruction],
            Some(&payer.pubkey()),
            &[&payer],
            Hash::new_unique(),
        )
    }

    fn fast_confirm(commitment: CommitmentConfig) -> ConfirmConfig {
        ConfirmConfig {
            commitment,
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_duplicate_of_confirmed_transaction_succeeds() {
        let rpc = TestRpc::default();
        let transaction = signed_transaction();

        let first = submit_transaction(&rpc, &transaction).await.unwrap();
        let second = submit_transaction(&rpc, &transaction).await.unwrap();

        assert_eq!(first, SubmitOutcome::Submitted(transaction.signatures[0]));
        assert_eq!(second, SubmitOutcome::AlreadyLanded(transaction.signatures[0]));
        assert_eq!(rpc.accepted_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_of_processed_transaction_fails() {
        let rpc = TestRpc::default();
        rpc.set_landing_status(Some(TestRpc::status(
            TransactionConfirmationStatus::Processed,
        )));
        let transaction = signed_transaction();

        submit_transaction(&rpc, &transaction).await.unwrap();
        let err = submit_transaction(&rpc, &transaction).await.unwrap_err();

        assert!(matches!(
            err,
            ClaimError::DuplicateSubmission { source, .. } if source.is_already_processed()
        ));
    }

    #[tokio::test]
    async fn test_rejected_send_is_ledger_rejection() {
        let rpc = TestRpc::default();
        rpc.push_send_failure(RpcError::from(TransactionError::InsufficientFundsForFee));
        let err = submit_transaction(&rpc, &signed_transaction())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClaimError::LedgerRejection {
                error: TransactionError::InsufficientFundsForFee,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_await_confirmation_at_processed() {
        let rpc = TestRpc::default();
        rpc.set_landing_status(Some(TestRpc::status(
            TransactionConfirmationStatus::Processed,
        )));
        let transaction = signed_transaction();
        let signature = submit_transaction(&rpc, &transaction)
            .await
            .unwrap()
            .signature();

        await_confirmation(&rpc, &signature, &fast_confirm(CommitmentConfig::processed()))
            .await
            .unwrap();

        let err = await_confirmation(&rpc, &signature, &fast_confirm(CommitmentConfig::finalized()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::ConfirmationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_await_confirmation_reports_failed_transaction() {
        let rpc = TestRpc::default();
        let signature = Signature::new_unique();
        rpc.set_signature_status(
            signature,
            TestRpc::failed_status(TransactionError::InstructionError(
                1,
                solana_sdk::instruction::InstructionError::Custom(0),
            )),
        );

        let err = await_confirmation(&rpc, &signature, &fast_confirm(CommitmentConfig::processed()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::LedgerRejection { .. }));
    }

    #[tokio::test]
    async fn test_await_confirmation_times_out_without_status() {
        let rpc = TestRpc::default();
        let err = await_confirmation(
            &rpc,
            &Signature::new_unique(),
            &fast_confirm(CommitmentConfig::processed()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClaimError::ConfirmationTimeout { .. }));
    }
}
