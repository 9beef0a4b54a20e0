use std::time::Duration;

use puf_client::rpc::RpcError;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};
use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("{0}")]
    Configuration(#[from] ConfigError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("RPC error: {0}")]
    Network(#[from] RpcError),

    #[error("Transaction {signature} was already processed but is not confirmed: {source}")]
    DuplicateSubmission {
        signature: Signature,
        #[source]
        source: RpcError,
    },

    #[error("Transaction {signature} failed: {error}")]
    LedgerRejection {
        signature: Signature,
        error: TransactionError,
    },

    #[error("Transaction {signature} was not confirmed within {timeout:?}")]
    ConfirmationTimeout {
        signature: Signature,
        timeout: Duration,
    },

    #[error("Wallet {recipient} has already claimed round {round}")]
    AlreadyClaimed { recipient: Pubkey, round: String },

    #[error("Invalid account data: {0}")]
    InvalidAccount(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PRIVATE_KEY not set in environment variables")]
    MissingPrivateKey,

    #[error("Invalid keypair data: {0}")]
    InvalidKeypair(String),

    #[error("Invalid pubkey: {field} - {error}")]
    InvalidPubkey { field: &'static str, error: String },

    #[error("Unsupported token program: {0}")]
    InvalidTokenProgram(Pubkey),

    #[error("Reward amount overflow: {amount} with {decimals} decimals does not fit in u64")]
    AmountOverflow { amount: u64, decimals: u8 },

    #[error("Mint account error: {0}")]
    MintAccount(String),
}

impl ClaimError {
    pub fn invalid_input<E: std::fmt::Display>(error: E) -> Self {
        Self::InvalidInput(error.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ClaimError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClaimError::AlreadyClaimed { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::Configuration(_) => "configuration",
            ClaimError::InvalidInput(_) => "invalid_input",
            ClaimError::Network(_) => "network",
            ClaimError::DuplicateSubmission { .. } => "duplicate_submission",
            ClaimError::LedgerRejection { .. } => "ledger_rejection",
            ClaimError::ConfirmationTimeout { .. } => "confirmation_timeout",
            ClaimError::AlreadyClaimed { .. } => "already_claimed",
            ClaimError::InvalidAccount(_) => "invalid_account",
        }
    }
}

/// A send failure that the node attributes to the transaction itself is a
/// ledger rejection. Everything else is a network problem.
pub(crate) fn submission_error(signature: Signature, error: RpcError) -> ClaimError {
    match error {
        RpcError::TransactionError(error) => ClaimError::LedgerRejection {
            signature,
            error: *error,
        },
        error => ClaimError::Network(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_private_key_message() {
        let err = ClaimError::from(ConfigError::MissingPrivateKey);
        assert_eq!(
            err.to_string(),
            "PRIVATE_KEY not set in environment variables"
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ClaimError::invalid_input("Recipient public key is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        let already = ClaimError::AlreadyClaimed {
            recipient: Pubkey::new_unique(),
            round: "1".to_string(),
        };
        assert_eq!(already.status_code(), StatusCode::CONFLICT);
        let network = ClaimError::from(RpcError::CustomError("unreachable".to_string()));
        assert_eq!(network.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_submission_error_classification() {
        let signature = Signature::default();
        let rejected = submission_error(
            signature,
            RpcError::from(TransactionError::InsufficientFundsForFee),
        );
        assert!(matches!(
            rejected,
            ClaimError::LedgerRejection {
                error: TransactionError::InsufficientFundsForFee,
                ..
            }
        ));

        let network = submission_error(signature, RpcError::CustomError("timeout".to_string()));
        assert!(matches!(network, ClaimError::Network(_)));
    }
}
