pub mod errors;
pub mod rpc_connection;
pub mod solana_rpc;
#[cfg(any(test, feature = "test-rpc"))]
pub mod test_rpc;

pub use errors::RpcError;
pub use rpc_connection::{RpcConnection, RpcConnectionConfig};
pub use solana_rpc::{RetryConfig, SolanaRpcConnection, SolanaRpcUrl};
#[cfg(any(test, feature = "test-rpc"))]
pub use test_rpc::TestRpc;
