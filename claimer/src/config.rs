use std::{str::FromStr, sync::Arc, time::Duration};

use puf_client::rpc::{RetryConfig, RpcConnectionConfig};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Keypair};

use crate::{
    cli::{CommitmentArg, RewardMode, StartArgs, TokenArgs},
    errors::ConfigError,
};

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub rpc_url: String,
    pub mint: Pubkey,
    pub token_program: Pubkey,
    pub retry_config: RetryConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmConfig {
    pub commitment: CommitmentConfig,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::processed(),
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Everything a claim needs, built once at startup and shared by handlers.
#[derive(Debug, Clone)]
pub struct ClaimConfig {
    pub token: TokenConfig,
    /// Absent when `PRIVATE_KEY` is unset; claims then fail without
    /// touching the network.
    pub treasury: Option<Arc<Keypair>>,
    pub reward_mode: RewardMode,
    pub reward_amount: u64,
    pub confirm: ConfirmConfig,
}

impl TokenConfig {
    pub fn new(args: &TokenArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_url: args.rpc_url.clone(),
            mint: parse_pubkey("mint", &args.mint)?,
            token_program: parse_token_program(&args.token_program)?,
            retry_config: RetryConfig {
                max_retries: args.rpc_max_retries.max(1),
                retry_delay: Duration::from_millis(args.rpc_retry_delay_ms),
                ..Default::default()
            },
        })
    }

    pub fn rpc_connection_config(&self, commitment: CommitmentConfig) -> RpcConnectionConfig {
        RpcConnectionConfig {
            url: self.rpc_url.clone(),
            commitment_config: Some(commitment),
            retry_config: Some(self.retry_config),
        }
    }
}

impl ClaimConfig {
    pub fn new_for_start(args: &StartArgs) -> Result<Self, ConfigError> {
        let treasury = match args.private_key.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Some(Arc::new(parse_keypair(secret)?)),
            _ => None,
        };

        Ok(Self {
            token: TokenConfig::new(&args.token)?,
            treasury,
            reward_mode: args.reward_mode,
            reward_amount: args.reward_amount,
            confirm: ConfirmConfig {
                commitment: commitment_config(args.commitment),
                poll_interval: Duration::from_millis(args.poll_interval_ms),
                timeout: Duration::from_millis(args.confirm_timeout_ms),
            },
        })
    }

    pub fn treasury(&self) -> Result<&Keypair, ConfigError> {
        self.treasury
            .as_deref()
            .ok_or(ConfigError::MissingPrivateKey)
    }
}

pub fn commitment_config(commitment: CommitmentArg) -> CommitmentConfig {
    match commitment {
        CommitmentArg::Processed => CommitmentConfig::processed(),
        CommitmentArg::Confirmed => CommitmentConfig::confirmed(),
        CommitmentArg::Finalized => CommitmentConfig::finalized(),
    }
}

/// Accepts a JSON byte array (`solana-keygen` file contents) or a base58
/// encoded 64 byte secret key.
pub fn parse_keypair(secret: &str) -> Result<Keypair, ConfigError> {
    let bytes: Vec<u8> = if secret.starts_with('[') {
        serde_json::from_str(secret).map_err(|e| ConfigError::InvalidKeypair(e.to_string()))?
    } else {
        bs58::decode(secret)
            .into_vec()
            .map_err(|e| ConfigError::InvalidKeypair(e.to_string()))?
    };
    Keypair::from_bytes(&bytes).map_err(|e| ConfigError::InvalidKeypair(e.to_string()))
}

pub fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, ConfigError> {
    Pubkey::from_str(value.trim()).map_err(|e| ConfigError::InvalidPubkey {
        field,
        error: e.to_string(),
    })
}

pub fn parse_token_program(value: &str) -> Result<Pubkey, ConfigError> {
    let program_id = match value.trim() {
        "token-2022" | "token2022" => spl_token_2022::id(),
        "spl-token" | "token" => spl_token::id(),
        other => parse_pubkey("token_program", other)?,
    };
    if program_id != spl_token_2022::id() && program_id != spl_token::id() {
        return Err(ConfigError::InvalidTokenProgram(program_id));
    }
    Ok(program_id)
}
