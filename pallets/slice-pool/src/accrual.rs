//! Lazy reward settlement.
//!
//! A pool's `acc_reward_per_slice` only moves when something touches the pool.
//! Settling over `last_settled_height + 1 ..= now` costs the same for one block
//! or a million: the subsidy source sums the window in closed form and the
//! pool's cut is taken at the power split of the moment.

use frame_support::pallet_prelude::*;
use sp_core::U256;
use sp_runtime::traits::SaturatedConversion;

use crate::{
    pallet::{Config, Error, Event, Pallet, Pools, RetiredAccumulators, TotalPower},
    types::{Pool, SliceAccount},
    LOG_TARGET,
};
use slicepool_primitives::{
    Balance, BlockNumber, PoolId, Power, SubsidySource, TitleId, ACC_REWARD_PRECISION,
};

/// `a * b / c` without intermediate overflow, rounding down.
pub(crate) fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let r = U256::from(a).checked_mul(U256::from(b))? / U256::from(c);
    if r > U256::from(u128::MAX) {
        return None;
    }
    Some(r.low_u128())
}

/// The pool's cut of `elapsed` issuance at its current power split.
pub(crate) fn pool_share(elapsed: Balance, power: Power, total_power: u128) -> Option<Balance> {
    mul_div(elapsed, power as u128, total_power)
}

/// Accumulator increase when `share` is spread over `total_slices`.
pub(crate) fn accumulator_step(share: Balance, total_slices: u128) -> Option<u128> {
    mul_div(share, ACC_REWARD_PRECISION, total_slices)
}

/// Reward earned by `shares` slices while the accumulator moved from `debt` to `acc`.
pub(crate) fn accrued(shares: u128, acc: u128, debt: u128) -> Option<Balance> {
    mul_div(shares, acc.checked_sub(debt)?, ACC_REWARD_PRECISION)
}

impl<T: Config> Pallet<T> {
    pub(crate) fn now() -> BlockNumber {
        <frame_system::Pallet<T>>::block_number().saturated_into::<BlockNumber>()
    }

    /// Bring `pool` up to the current block. Only touches the in-memory copy.
    pub(crate) fn settle(pool: &mut Pool) -> DispatchResult {
        let now = Self::now();
        if now <= pool.last_settled_height {
            return Ok(());
        }

        let elapsed = T::Subsidy::cumulative_subsidy(pool.last_settled_height + 1, now);
        let total_power = TotalPower::<T>::get();
        let total_slices = Self::stake_for(pool.power)?;

        if elapsed > 0 && total_power > 0 && total_slices > 0 {
            let share = pool_share(elapsed, pool.power, total_power)
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            let step =
                accumulator_step(share, total_slices).ok_or(Error::<T>::ArithmeticOverflow)?;
            pool.acc_reward_per_slice = pool
                .acc_reward_per_slice
                .checked_add(step)
                .ok_or(Error::<T>::ArithmeticOverflow)?;

            log::debug!(
                target: LOG_TARGET,
                "settled title {} over {}..={}: share {} of {}",
                pool.title_id,
                pool.last_settled_height + 1,
                now,
                share,
                elapsed
            );
        }

        pool.last_settled_height = now;
        Ok(())
    }

    /// Roll what `account` earned since its last reconciliation into `unclaimed`.
    pub(crate) fn reconcile(account: &mut SliceAccount, acc: u128) -> DispatchResult {
        let earned = accrued(account.shares(), acc, account.reward_debt)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        account.unclaimed = account
            .unclaimed
            .checked_add(earned)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        account.reward_debt = acc;
        Ok(())
    }

    /// Live pool at `pool_id`, settled in memory.
    pub(crate) fn settled_pool(pool_id: PoolId) -> Result<Pool, DispatchError> {
        let mut pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
        Self::settle(&mut pool)?;
        Ok(pool)
    }

    /// Current accumulator of a title, live or retired. Live pools are settled
    /// and returned so the caller can persist them.
    pub(crate) fn title_accumulator(
        title_id: TitleId,
    ) -> Result<(u128, Option<(PoolId, Pool)>), DispatchError> {
        if let Some(pool_id) = Self::pool_of_title(title_id) {
            let pool = Self::settled_pool(pool_id)?;
            return Ok((pool.acc_reward_per_slice, Some((pool_id, pool))));
        }
        let acc = RetiredAccumulators::<T>::get(title_id).ok_or(Error::<T>::PoolNotFound)?;
        Ok((acc, None))
    }

    /// Pay up to `limit` of `account.unclaimed` to `who`. Returns the amount paid.
    pub(crate) fn pay_out(
        who: &T::AccountId,
        title_id: TitleId,
        account: &mut SliceAccount,
        limit: Balance,
    ) -> Result<Balance, DispatchError> {
        let amount = account.unclaimed.min(limit);
        if amount == 0 {
            return Ok(0);
        }
        T::Subsidy::claim(who, amount)?;
        account.unclaimed -= amount;

        Self::deposit_event(Event::Mined { title_id, who: who.clone(), amount });
        log::debug!(target: LOG_TARGET, "paid {} on title {}", amount, title_id);
        Ok(amount)
    }

    pub(crate) fn do_mine(who: &T::AccountId, pool_id: PoolId, limit: Balance) -> DispatchResult {
        let pool = Self::settled_pool(pool_id)?;
        let title_id = pool.title_id;

        let mut account = Self::slice_account(title_id, who);
        Self::reconcile(&mut account, pool.acc_reward_per_slice)?;
        Self::pay_out(who, title_id, &mut account, limit)?;

        Pools::<T>::insert(pool_id, pool);
        Self::put_slice_account(title_id, who, account);
        Ok(())
    }

    /// Claim against a deleted pool's frozen accumulator. Once nothing is left
    /// unclaimed the holder's inert slices are burned.
    pub(crate) fn do_mine_retired(
        who: &T::AccountId,
        title_id: TitleId,
        limit: Balance,
    ) -> DispatchResult {
        let acc = RetiredAccumulators::<T>::get(title_id).ok_or(Error::<T>::TitleNotRetired)?;

        let mut account = Self::slice_account(title_id, who);
        Self::reconcile(&mut account, acc)?;
        Self::pay_out(who, title_id, &mut account, limit)?;
        if account.unclaimed == 0 {
            account.balance = 0;
        }

        Self::put_slice_account(title_id, who, account);
        Ok(())
    }

    /// Reward `who` could claim from a live pool right now. Read-only.
    pub fn pending_reward(pool_id: PoolId, who: &T::AccountId) -> Balance {
        let Ok(pool) = Self::settled_pool(pool_id) else {
            return 0;
        };
        let mut account = Self::slice_account(pool.title_id, who);
        match Self::reconcile(&mut account, pool.acc_reward_per_slice) {
            Ok(()) => account.unclaimed,
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_rounds_down() {
        assert_eq!(mul_div(10, 10, 3), Some(33));
        assert_eq!(mul_div(7, 0, 3), Some(0));
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn mul_div_survives_wide_intermediate() {
        assert_eq!(mul_div(u128::MAX, 4, 8), Some(u128::MAX / 2));
        assert_eq!(mul_div(u128::MAX, 2, 1), None);
    }

    #[test]
    fn share_follows_power_split() {
        assert_eq!(pool_share(1_000, 1, 4), Some(250));
        assert_eq!(pool_share(1_000, 3, 3), Some(1_000));
        assert_eq!(pool_share(1_000, 1, 3), Some(333));
    }

    #[test]
    fn accumulator_round_trip_is_exact_for_even_split() {
        let step = accumulator_step(2_500_000_000, 10_000).unwrap();
        assert_eq!(accrued(10_000, step, 0), Some(2_500_000_000));
        assert_eq!(accrued(5_000, step, 0), Some(1_250_000_000));
    }

    #[test]
    fn accrued_never_exceeds_share() {
        let share = 1_000_000_007u128;
        let total = 30_000u128;
        let step = accumulator_step(share, total).unwrap();
        let paid: u128 = [10_000u128, 7_000, 13_000]
            .iter()
            .map(|s| accrued(*s, step, 0).unwrap())
            .sum();
        assert!(paid <= share);
    }

    #[test]
    fn accrued_rejects_debt_ahead_of_accumulator() {
        assert_eq!(accrued(1, 5, 6), None);
        assert_eq!(accrued(0, 6, 6), Some(0));
    }
}
