//! Slice Pool Core Primitives
//!
//! Scalar types and the virtual-bitcoin issuance curve shared by the
//! subsidy source and the pool ledger.
//! 25 VBTC per block, halving every 420,000 blocks, 21M cap.

#![cfg_attr(not(feature = "std"), no_std)]

use codec::{Decode, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_core::RuntimeDebug;
use sp_runtime::DispatchResult;

/// 1 VBTC = 10^8 satoshi (smallest unit)
pub const COIN: u128 = 100_000_000;

/// Hard cap on everything the subsidy source will ever pay out
pub const MAX_SUPPLY: u128 = 21_000_000 * COIN;

/// Subsidy of the first era
pub const INITIAL_SUBSIDY: u128 = 25 * COIN;

/// Blocks per halving era
pub const BLOCKS_PER_HALVING: u32 = 420_000;

/// After this many halvings the subsidy is gone
pub const MAX_HALVINGS: u32 = 64;

/// Slices minted per unit of mining power.
/// One token unit of stake backs one slice.
pub const SLICES_PER_POWER: u128 = 10_000;

/// Fixed-point scale of the per-slice reward accumulator
pub const ACC_REWARD_PRECISION: u128 = 1_000_000_000_000;

pub type BlockNumber = u32;
pub type Balance = u128;

/// Abstract mining power staked into a pool
pub type Power = u64;
/// Storage slot of a pool (reused after deletion)
pub type PoolId = u32;
/// Administrative title of a pool (never reused)
pub type TitleId = u64;
pub type SaleId = u64;
pub type GroupBuyingId = u64;

/// Snapshot of the emission schedule at some height
#[derive(Clone, Copy, PartialEq, Eq, Encode, Decode, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct EmissionInfo {
    pub subsidy: Balance,
    pub blocks_until_halving: BlockNumber,
    pub era: u32,
}

/// Issuance of a single block. Genesis issues nothing.
pub fn subsidy_at(height: BlockNumber) -> Balance {
    if height == 0 {
        return 0;
    }
    let halvings = current_era(height);
    if halvings >= MAX_HALVINGS {
        return 0;
    }
    INITIAL_SUBSIDY >> halvings
}

/// Total issuance of heights `1..=height`.
pub fn supply_at(height: BlockNumber) -> Balance {
    let mut total = 0u128;
    let mut remaining_blocks = height;
    // era 0 starts at height 1, so it is one block short
    let mut blocks_in_era = BLOCKS_PER_HALVING - 1;
    let mut halving = 0u32;
    while remaining_blocks > 0 && halving < MAX_HALVINGS {
        let counted = remaining_blocks.min(blocks_in_era);
        total += (INITIAL_SUBSIDY >> halving) * counted as u128;
        remaining_blocks -= counted;
        blocks_in_era = BLOCKS_PER_HALVING;
        halving += 1;
    }
    total
}

/// Issuance over the inclusive height range `from..=to`. Empty ranges yield zero.
pub fn cumulative_subsidy(from: BlockNumber, to: BlockNumber) -> Balance {
    if from > to {
        return 0;
    }
    supply_at(to) - supply_at(from.saturating_sub(1))
}

/// Issuance schedule the pool ledger draws rewards from.
pub trait SubsidySource<AccountId> {
    /// Issuance of a single block.
    fn subsidy_at(height: BlockNumber) -> Balance;

    /// Issuance over `from..=to`. Override when a closed form is available.
    fn cumulative_subsidy(from: BlockNumber, to: BlockNumber) -> Balance {
        if from > to {
            return 0;
        }
        (from..=to).fold(0u128, |acc, h| acc.saturating_add(Self::subsidy_at(h)))
    }

    /// Pay `amount` of issued reward to `who`.
    fn claim(who: &AccountId, amount: Balance) -> DispatchResult;
}

pub fn current_era(height: BlockNumber) -> u32 {
    height / BLOCKS_PER_HALVING
}

pub fn blocks_until_halving(height: BlockNumber) -> BlockNumber {
    BLOCKS_PER_HALVING - (height % BLOCKS_PER_HALVING)
}

pub fn emission_info(height: BlockNumber) -> EmissionInfo {
    EmissionInfo {
        subsidy: subsidy_at(height),
        blocks_until_halving: blocks_until_halving(height),
        era: current_era(height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_supply() {
        assert_eq!(MAX_SUPPLY, 21_000_000 * COIN);
    }

    #[test]
    fn test_subsidy() {
        assert_eq!(subsidy_at(0), 0);
        assert_eq!(subsidy_at(1), INITIAL_SUBSIDY);
        assert_eq!(subsidy_at(BLOCKS_PER_HALVING - 1), INITIAL_SUBSIDY);
        assert_eq!(subsidy_at(BLOCKS_PER_HALVING), INITIAL_SUBSIDY / 2);
        assert_eq!(subsidy_at(BLOCKS_PER_HALVING * 2), INITIAL_SUBSIDY / 4);
    }

    #[test]
    fn test_supply_matches_iteration() {
        let mut total = 0u128;
        for h in 1..=1_000u32 {
            total += subsidy_at(h);
            assert_eq!(supply_at(h), total);
        }
    }

    #[test]
    fn test_supply_across_halving() {
        let edge = BLOCKS_PER_HALVING;
        assert_eq!(supply_at(edge) - supply_at(edge - 1), INITIAL_SUBSIDY / 2);
        assert_eq!(supply_at(edge - 1) - supply_at(edge - 2), INITIAL_SUBSIDY);
        assert_eq!(
            cumulative_subsidy(edge - 2, edge + 1),
            INITIAL_SUBSIDY * 2 + INITIAL_SUBSIDY / 2 * 2
        );
    }

    #[test]
    fn test_cumulative_range() {
        assert_eq!(cumulative_subsidy(101, 110), INITIAL_SUBSIDY * 10);
        assert_eq!(cumulative_subsidy(110, 110), INITIAL_SUBSIDY);
        assert_eq!(cumulative_subsidy(111, 110), 0);
        assert_eq!(cumulative_subsidy(0, 3), INITIAL_SUBSIDY * 3);
    }

    #[test]
    fn test_total_emission_below_cap() {
        assert!(supply_at(u32::MAX) <= MAX_SUPPLY);
    }

    #[test]
    fn test_emission_info() {
        let info = emission_info(BLOCKS_PER_HALVING + 5);
        assert_eq!(info.era, 1);
        assert_eq!(info.subsidy, INITIAL_SUBSIDY / 2);
        assert_eq!(info.blocks_until_halving, BLOCKS_PER_HALVING - 5);
    }
}
