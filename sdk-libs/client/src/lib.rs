#![allow(clippy::result_large_err)]

pub mod rpc;

pub use rpc::{RpcConnection, RpcError};
