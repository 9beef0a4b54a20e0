use dashmap::{mapref::entry::Entry, DashMap};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::errors::ClaimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Pending,
    Claimed(Signature),
}

/// Longest round label accepted from a request.
pub const MAX_ROUND_LEN: usize = 64;

/// One payout per wallet per round, for the lifetime of the process.
///
/// Entries are never evicted. A claim whose outcome is unknown (send-time
/// network error, confirmation timeout) stays `Pending` and blocks that
/// wallet for that round until the process restarts.
#[derive(Debug, Default)]
pub struct ClaimLedger {
    claims: DashMap<(Pubkey, String), ClaimState>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the pair pending. A pending or completed claim for the same
    /// pair rejects the reservation.
    pub fn reserve(&self, recipient: Pubkey, round: &str) -> Result<(), ClaimError> {
        match self.claims.entry((recipient, round.to_string())) {
            Entry::Occupied(_) => Err(ClaimError::AlreadyClaimed {
                recipient,
                round: round.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(ClaimState::Pending);
                Ok(())
            }
        }
    }

    pub fn commit(&self, recipient: Pubkey, round: &str, signature: Signature) {
        self.claims.insert(
            (recipient, round.to_string()),
            ClaimState::Claimed(signature),
        );
    }

    /// Drops a pending reservation so the wallet can try again.
    pub fn release(&self, recipient: Pubkey, round: &str) {
        self.claims
            .remove_if(&(recipient, round.to_string()), |_, state| {
                *state == ClaimState::Pending
            });
    }

    pub fn get(&self, recipient: Pubkey, round: &str) -> Option<ClaimState> {
        self.claims
            .get(&(recipient, round.to_string()))
            .map(|state| *state)
    }
}
