use std::io;

use solana_client::client_error::ClientError;
use solana_sdk::{pubkey::Pubkey, transaction::TransactionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("TransactionError: {0}")]
    TransactionError(#[from] Box<TransactionError>),

    #[error("ClientError: {0}")]
    ClientError(#[from] Box<ClientError>),

    #[error("IoError: {0}")]
    IoError(#[from] Box<io::Error>),

    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("Error: `{0}`")]
    CustomError(String),
}

impl From<TransactionError> for RpcError {
    fn from(err: TransactionError) -> Self {
        RpcError::TransactionError(Box::new(err))
    }
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        RpcError::ClientError(Box::new(err))
    }
}

impl From<io::Error> for RpcError {
    fn from(err: io::Error) -> Self {
        RpcError::IoError(Box::new(err))
    }
}

impl RpcError {
    /// Lifts the ledger-level error out of a send failure, including
    /// preflight simulation failures reported by the node.
    pub fn from_send_error(err: ClientError) -> Self {
        match err.get_transaction_error() {
            Some(tx_err) => RpcError::from(tx_err),
            None => RpcError::from(err),
        }
    }

    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            RpcError::TransactionError(err) => Some(err),
            _ => None,
        }
    }

    /// The node has already seen a transaction with this signature.
    pub fn is_already_processed(&self) -> bool {
        matches!(
            self.transaction_error(),
            Some(TransactionError::AlreadyProcessed)
        )
    }
}

#[cfg(test)]
mod tests {
    use solana_client::{
        client_error::ClientErrorKind,
        rpc_request::{RpcError as RequestError, RpcResponseErrorData},
        rpc_response::RpcSimulateTransactionResult,
    };

    use super::*;

    #[test]
    fn test_send_error_lifts_transaction_error() {
        let client_error = ClientError::from(ClientErrorKind::TransactionError(
            TransactionError::AlreadyProcessed,
        ));
        let err = RpcError::from_send_error(client_error);
        assert!(err.is_already_processed());
    }

    #[test]
    fn test_send_error_lifts_preflight_failure() {
        let simulation: RpcSimulateTransactionResult =
            serde_json::from_value(serde_json::json!({ "err": "AlreadyProcessed" })).unwrap();
        let client_error = ClientError::from(ClientErrorKind::RpcError(
            RequestError::RpcResponseError {
                code: -32002,
                message: "Transaction simulation failed: This transaction has already been processed"
                    .to_string(),
                data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            },
        ));
        let err = RpcError::from_send_error(client_error);
        assert!(err.is_already_processed());
    }

    #[test]
    fn test_other_errors_are_not_already_processed() {
        let err = RpcError::from(TransactionError::BlockhashNotFound);
        assert!(!err.is_already_processed());

        let err = RpcError::from_send_error(ClientError::from(ClientErrorKind::Custom(
            "connection refused".to_string(),
        )));
        assert!(matches!(err, RpcError::ClientError(_)));
        assert!(err.transaction_error().is_none());
    }
}
