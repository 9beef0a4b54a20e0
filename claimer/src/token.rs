use solana_sdk::{account::Account, pubkey::Pubkey};
use spl_token_2022::{
    extension::StateWithExtensions,
    state::{Account as TokenAccount, Mint},
};

use crate::errors::{ClaimError, ConfigError};

/// Reads the decimal precision of a mint owned by `token_program`.
/// Token-2022 extensions are skipped over.
pub fn unpack_mint_decimals(
    mint: &Pubkey,
    account: &Account,
    token_program: &Pubkey,
) -> Result<u8, ClaimError> {
    if account.owner != *token_program {
        return Err(ConfigError::MintAccount(format!(
            "{} is owned by {}, expected {}",
            mint, account.owner, token_program
        ))
        .into());
    }
    let state = StateWithExtensions::<Mint>::unpack(&account.data)
        .map_err(|e| ConfigError::MintAccount(format!("{}: {}", mint, e)))?;
    Ok(state.base.decimals)
}

pub fn unpack_token_amount(address: &Pubkey, account: &Account) -> Result<u64, ClaimError> {
    let state = StateWithExtensions::<TokenAccount>::unpack(&account.data)
        .map_err(|e| ClaimError::InvalidAccount(format!("{}: {}", address, e)))?;
    Ok(state.base.amount)
}

/// `face_amount * 10^decimals`, exact. Fails instead of rounding when the
/// result leaves `u64`.
pub fn scale_amount(face_amount: u64, decimals: u8) -> Result<u64, ConfigError> {
    10u64
        .checked_pow(u32::from(decimals))
        .and_then(|factor| face_amount.checked_mul(factor))
        .ok_or(ConfigError::AmountOverflow {
            amount: face_amount,
            decimals,
        })
}

pub fn format_ui_amount(raw_amount: u64, decimals: u8) -> String {
    spl_token_2022::amount_to_ui_amount_string_trimmed(raw_amount, decimals)
}

#[cfg(test)]
mod tests {
    use solana_sdk::program_pack::Pack;

    use super::*;

    fn mint_account(decimals: u8, owner: Pubkey) -> Account {
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(
            Mint {
                mint_authority: Some(Pubkey::new_unique()).into(),
                supply: 0,
                decimals,
                is_initialized: true,
                freeze_authority: None.into(),
            },
            &mut data,
        )
        .unwrap();
        Account {
            lamports: 1_461_600,
            data,
            owner,
            executable: false,
            rent_epoch: 0,
        }
    }

    #[test]
    fn test_scale_amount_is_exact() {
        assert_eq!(scale_amount(1000, 6).unwrap(), 1_000_000_000);
        assert_eq!(scale_amount(100, 9).unwrap(), 100_000_000_000);
        assert_eq!(scale_amount(10, 0).unwrap(), 10);
        // 2^53 + 1 is not representable as f64.
        assert_eq!(scale_amount(9_007_199_254_740_993, 0).unwrap(), 9_007_199_254_740_993);
        assert_eq!(
            scale_amount(1_844, 16).unwrap(),
            18_440_000_000_000_000_000
        );
    }

    #[test]
    fn test_scale_amount_overflow() {
        assert!(matches!(
            scale_amount(1000, 19),
            Err(ConfigError::AmountOverflow {
                amount: 1000,
                decimals: 19
            })
        ));
        assert!(scale_amount(1, 20).is_err());
        assert!(scale_amount(u64::MAX, 1).is_err());
    }

    #[test]
    fn test_unpack_mint_decimals() {
        let mint = Pubkey::new_unique();
        let account = mint_account(6, spl_token_2022::id());
        assert_eq!(
            unpack_mint_decimals(&mint, &account, &spl_token_2022::id()).unwrap(),
            6
        );
    }

    #[test]
    fn test_unpack_mint_wrong_owner() {
        let mint = Pubkey::new_unique();
        let account = mint_account(6, spl_token::id());
        let err = unpack_mint_decimals(&mint, &account, &spl_token_2022::id()).unwrap_err();
        assert!(matches!(
            err,
            ClaimError::Configuration(ConfigError::MintAccount(_))
        ));
    }

    #[test]
    fn test_unpack_token_amount_rejects_short_data() {
        let address = Pubkey::new_unique();
        let account = Account {
            lamports: 1,
            data: vec![0u8; 10],
            owner: spl_token::id(),
            executable: false,
            rent_epoch: 0,
        };
        assert!(matches!(
            unpack_token_amount(&address, &account),
            Err(ClaimError::InvalidAccount(_))
        ));
    }

    #[test]
    fn test_format_ui_amount() {
        assert_eq!(format_ui_amount(1_000_000_000, 6), "1000");
        assert_eq!(format_ui_amount(1_500_000, 6), "1.5");
        assert_eq!(format_ui_amount(0, 6), "0");
    }
}
