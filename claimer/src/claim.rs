use std::{str::FromStr, sync::Arc};

use puf_client::rpc::RpcConnection;
use serde::Deserialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::ClaimConfig,
    errors::{ClaimError, ConfigError},
    instructions::{build_claim_instructions, derive_token_account, ClaimInstructionInputs},
    ledger::{ClaimLedger, MAX_ROUND_LEN},
    metrics,
    send_transaction::{await_confirmation, submit_transaction, SubmitOutcome},
    token::{format_ui_amount, scale_amount, unpack_mint_decimals, unpack_token_amount},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub recipient: Option<String>,
    /// Voting round the reward belongs to. When present, a wallet is paid at
    /// most once per round.
    #[serde(default)]
    pub round: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub signature: Signature,
    pub recipient: Pubkey,
    pub token_account: Pubkey,
    pub amount: u64,
    pub decimals: u8,
    pub created_token_account: bool,
    pub recovered_duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub owner: Pubkey,
    pub token_account: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

impl TokenBalance {
    pub fn ui_amount(&self) -> String {
        format_ui_amount(self.amount, self.decimals)
    }
}

#[derive(Debug)]
struct PreparedClaim {
    transaction: Transaction,
    recipient: Pubkey,
    token_account: Pubkey,
    amount: u64,
    decimals: u8,
    created_token_account: bool,
}

pub fn parse_recipient(recipient: Option<&str>) -> Result<Pubkey, ClaimError> {
    let recipient = recipient.map(str::trim).unwrap_or_default();
    if recipient.is_empty() {
        return Err(ClaimError::invalid_input("Recipient public key is required"));
    }
    Pubkey::from_str(recipient)
        .map_err(|e| ClaimError::InvalidInput(format!("Invalid recipient public key: {}", e)))
}

/// Blank rounds are treated as absent.
pub fn parse_round(round: Option<&str>) -> Result<Option<&str>, ClaimError> {
    let Some(round) = round.map(str::trim).filter(|round| !round.is_empty()) else {
        return Ok(None);
    };
    if round.len() > MAX_ROUND_LEN {
        return Err(ClaimError::InvalidInput(format!(
            "Round label exceeds {} bytes",
            MAX_ROUND_LEN
        )));
    }
    Ok(Some(round))
}

/// Pays the configured reward to one wallet per call.
#[derive(Debug)]
pub struct ClaimService<R: RpcConnection> {
    rpc: Arc<R>,
    config: Arc<ClaimConfig>,
    ledger: ClaimLedger,
}

impl<R: RpcConnection> ClaimService<R> {
    pub fn new(rpc: Arc<R>, config: Arc<ClaimConfig>) -> Self {
        Self {
            rpc,
            config,
            ledger: ClaimLedger::new(),
        }
    }

    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn ledger(&self) -> &ClaimLedger {
        &self.ledger
    }

    #[instrument(level = "debug", skip(self, request), fields(recipient = ?request.recipient, round = ?request.round))]
    pub async fn claim(&self, request: &ClaimRequest) -> Result<ClaimOutcome, ClaimError> {
        let start = Instant::now();
        let result = self.process_claim(request).await;
        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(outcome) => {
                info!(
                    "Paid {} raw units to {} ({}), signature {}",
                    outcome.amount, outcome.recipient, outcome.token_account, outcome.signature
                );
                metrics::record_claim("success", elapsed, outcome.created_token_account);
            }
            Err(e) => {
                error!("Claim error ({}): {}", e.kind(), e);
                metrics::record_claim(e.kind(), elapsed, false);
            }
        }
        result
    }

    async fn process_claim(&self, request: &ClaimRequest) -> Result<ClaimOutcome, ClaimError> {
        let recipient = parse_recipient(request.recipient.as_deref())?;
        let round = parse_round(request.round.as_deref())?;
        let treasury = self.config.treasury()?;

        let Some(round) = round else {
            let prepared = self.prepare(treasury, recipient).await?;
            return self.submit(prepared).await;
        };

        self.ledger.reserve(recipient, round)?;
        let prepared = match self.prepare(treasury, recipient).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.ledger.release(recipient, round);
                return Err(e);
            }
        };
        match self.submit(prepared).await {
            Ok(outcome) => {
                self.ledger.commit(recipient, round, outcome.signature);
                Ok(outcome)
            }
            Err(e @ ClaimError::LedgerRejection { .. }) => {
                self.ledger.release(recipient, round);
                Err(e)
            }
            Err(e) => {
                warn!(
                    "Claim of {} for round {} has unknown outcome, keeping it pending",
                    recipient, round
                );
                Err(e)
            }
        }
    }

    async fn fetch_mint_decimals(&self) -> Result<u8, ClaimError> {
        let token = &self.config.token;
        let mint_account = self.rpc.get_account(token.mint).await?.ok_or_else(|| {
            ConfigError::MintAccount(format!("mint {} not found", token.mint))
        })?;
        unpack_mint_decimals(&token.mint, &mint_account, &token.token_program)
    }

    async fn prepare(
        &self,
        treasury: &Keypair,
        recipient: Pubkey,
    ) -> Result<PreparedClaim, ClaimError> {
        let token = &self.config.token;
        let decimals = self.fetch_mint_decimals().await?;
        let token_account = derive_token_account(&recipient, &token.mint, &token.token_program);
        let account_exists = self.rpc.get_account(token_account).await?.is_some();
        let amount = scale_amount(self.config.reward_amount, decimals)?;
        debug!(
            "Recipient token account {} exists: {}, amount {} ({} decimals)",
            token_account, account_exists, amount, decimals
        );

        let instructions = build_claim_instructions(ClaimInstructionInputs {
            treasury: treasury.pubkey(),
            recipient,
            recipient_token_account: token_account,
            recipient_account_exists: account_exists,
            mint: token.mint,
            token_program: token.token_program,
            reward_mode: self.config.reward_mode,
            amount,
            decimals,
        })?;

        let blockhash = self.rpc.get_latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&treasury.pubkey()),
            &[treasury],
            blockhash,
        );

        Ok(PreparedClaim {
            transaction,
            recipient,
            token_account,
            amount,
            decimals,
            created_token_account: !account_exists,
        })
    }

    async fn submit(&self, prepared: PreparedClaim) -> Result<ClaimOutcome, ClaimError> {
        let submitted = submit_transaction(&*self.rpc, &prepared.transaction).await?;
        if let SubmitOutcome::Submitted(signature) = submitted {
            await_confirmation(&*self.rpc, &signature, &self.config.confirm).await?;
        }
        Ok(ClaimOutcome {
            signature: submitted.signature(),
            recipient: prepared.recipient,
            token_account: prepared.token_account,
            amount: prepared.amount,
            decimals: prepared.decimals,
            created_token_account: prepared.created_token_account,
            recovered_duplicate: matches!(submitted, SubmitOutcome::AlreadyLanded(_)),
        })
    }

    /// Reward token balance of `owner`, read straight from the ledger. A
    /// wallet without a token account holds zero.
    pub async fn token_balance(&self, owner: &str) -> Result<TokenBalance, ClaimError> {
        let owner = Pubkey::from_str(owner.trim())
            .map_err(|e| ClaimError::InvalidInput(format!("Invalid owner public key: {}", e)))?;
        let token = &self.config.token;
        let decimals = self.fetch_mint_decimals().await?;
        let token_account = derive_token_account(&owner, &token.mint, &token.token_program);
        let amount = match self.rpc.get_account(token_account).await? {
            Some(account) => unpack_token_amount(&token_account, &account)?,
            None => 0,
        };
        Ok(TokenBalance {
            owner,
            token_account,
            amount,
            decimals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient() {
        let key = Pubkey::new_unique();
        assert_eq!(parse_recipient(Some(&key.to_string())).unwrap(), key);
        assert_eq!(
            parse_recipient(Some(&format!("  {}\n", key))).unwrap(),
            key
        );
    }

    #[test]
    fn test_parse_recipient_rejects_missing_and_malformed() {
        for input in [None, Some(""), Some("   ")] {
            let err = parse_recipient(input).unwrap_err();
            assert_eq!(err.to_string(), "Recipient public key is required");
        }
        for input in ["not-a-key", "0OIl", "1111", "Rz1"] {
            assert!(matches!(
                parse_recipient(Some(input)),
                Err(ClaimError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_parse_round() {
        assert_eq!(parse_round(None).unwrap(), None);
        assert_eq!(parse_round(Some("  ")).unwrap(), None);
        assert_eq!(parse_round(Some(" round-4 ")).unwrap(), Some("round-4"));

        let longest = "r".repeat(MAX_ROUND_LEN);
        assert_eq!(parse_round(Some(&longest)).unwrap(), Some(longest.as_str()));
        let too_long = "r".repeat(MAX_ROUND_LEN + 1);
        assert!(matches!(
            parse_round(Some(&too_long)),
            Err(ClaimError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_claim_request_deserialize() {
        let request: ClaimRequest = serde_json::from_str(r#"{"recipient":"abc"}"#).unwrap();
        assert_eq!(request.recipient.as_deref(), Some("abc"));
        assert!(request.round.is_none());

        let request: ClaimRequest = serde_json::from_str("{}").unwrap();
        assert!(request.recipient.is_none());
    }
}
