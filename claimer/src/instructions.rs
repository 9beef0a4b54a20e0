use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

use crate::{
    cli::RewardMode,
    errors::{ClaimError, ConfigError},
};

pub fn derive_token_account(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, token_program)
}

#[derive(Debug, Clone, Copy)]
pub struct ClaimInstructionInputs {
    pub treasury: Pubkey,
    pub recipient: Pubkey,
    pub recipient_token_account: Pubkey,
    pub recipient_account_exists: bool,
    pub mint: Pubkey,
    pub token_program: Pubkey,
    pub reward_mode: RewardMode,
    /// Raw units, already scaled by the mint decimals.
    pub amount: u64,
    pub decimals: u8,
}

/// Optional account creation funded by the treasury, then the single
/// mint-to or transfer carrying the reward.
pub fn build_claim_instructions(
    inputs: ClaimInstructionInputs,
) -> Result<Vec<Instruction>, ClaimError> {
    let mut instructions = Vec::with_capacity(2);
    if !inputs.recipient_account_exists {
        instructions.push(create_associated_token_account_idempotent(
            &inputs.treasury,
            &inputs.recipient,
            &inputs.mint,
            &inputs.token_program,
        ));
    }

    let reward = match inputs.reward_mode {
        RewardMode::Mint => spl_token_2022::instruction::mint_to_checked(
            &inputs.token_program,
            &inputs.mint,
            &inputs.recipient_token_account,
            &inputs.treasury,
            &[],
            inputs.amount,
            inputs.decimals,
        ),
        RewardMode::Transfer => {
            let source =
                derive_token_account(&inputs.treasury, &inputs.mint, &inputs.token_program);
            spl_token_2022::instruction::transfer_checked(
                &inputs.token_program,
                &source,
                &inputs.mint,
                &inputs.recipient_token_account,
                &inputs.treasury,
                &[],
                inputs.amount,
                inputs.decimals,
            )
        }
    }
    .map_err(|_| ConfigError::InvalidTokenProgram(inputs.token_program))?;
    instructions.push(reward);

    Ok(instructions)
}
