//! Storage records of the slice pool ledger.

use codec::{Decode, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

use slicepool_primitives::{Balance, BlockNumber, PoolId, Power, TitleId};

/// A live mining-power allocation.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct Pool {
    /// Administrative title minted with the pool
    pub title_id: TitleId,
    pub power: Power,
    /// Height through which reward has been accounted
    pub last_settled_height: BlockNumber,
    /// Reward earned by one slice since inception, scaled by `ACC_REWARD_PRECISION`
    pub acc_reward_per_slice: u128,
}

/// One holder's position in one pool, keyed by the pool's title.
///
/// `escrowed` slices sit in open listings: the holder cannot move them but
/// keeps earning on them until they are bought.
#[derive(Encode, Decode, Clone, Default, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct SliceAccount {
    pub balance: u128,
    pub escrowed: u128,
    /// Accumulator value at the last reconciliation
    pub reward_debt: u128,
    /// Reward rolled forward but not yet paid
    pub unclaimed: Balance,
}

impl SliceAccount {
    /// Slices that earn reward for this holder.
    pub fn shares(&self) -> u128 {
        self.balance.saturating_add(self.escrowed)
    }

    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.escrowed == 0 && self.unclaimed == 0
    }
}

/// Fixed-price listing. `slices` and `price` shrink together on partial fills.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct Sale<AccountId> {
    pub seller: AccountId,
    pub pool_id: PoolId,
    pub title_id: TitleId,
    pub slices: u128,
    pub price: Balance,
}

/// Crowdfunding round. Open while `pool_id` is `None`.
#[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct GroupBuying {
    pub target_power: Power,
    /// Remaining slice-equivalent capacity
    pub slices_left: u128,
    /// Distinct contributors with a non-zero contribution
    pub buyers: u32,
    pub pool_id: Option<PoolId>,
}

impl GroupBuying {
    pub fn is_completed(&self) -> bool {
        self.pool_id.is_some()
    }
}
