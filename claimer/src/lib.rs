pub mod api_server;
pub mod claim;
pub mod cli;
pub mod config;
pub mod errors;
pub mod instructions;
pub mod ledger;
pub mod metrics;
pub mod send_transaction;
pub mod telemetry;
pub mod token;

pub use claim::{ClaimOutcome, ClaimRequest, ClaimService, TokenBalance};
pub use config::ClaimConfig;
pub use errors::{ClaimError, ConfigError};
