//! Group buying.
//!
//! Open -> Completed, nothing else. Contributions are counted in
//! slice-equivalents (one token each) and sit in the pallet account. The
//! contribution that brings `slices_left` to zero creates the pool, titled to
//! the pallet account, and mints each contributor exactly what they put in.

use frame_support::{
    pallet_prelude::*,
    traits::{Currency, ExistenceRequirement},
};
use sp_std::vec::Vec;

use crate::{
    pallet::{
        Config, Error, Event, GroupBuyingSlices, GroupBuyings, NextGroupBuyingId, Pallet,
    },
    types::GroupBuying,
    LOG_TARGET,
};
use slicepool_primitives::{GroupBuyingId, Power};

/// Completion mints to every contributor, so cost grows with the contributor cap.
pub(crate) fn completion_weight<T: Config>() -> Weight {
    Weight::from_parts(60_000_000, 0).saturating_add(
        Weight::from_parts(10_000_000, 0).saturating_mul(T::MaxGroupBuyers::get() as u64),
    )
}

impl<T: Config> Pallet<T> {
    pub(crate) fn do_suggest_group_buying(
        who: &T::AccountId,
        target_power: Power,
        amount: u128,
    ) -> DispatchResult {
        ensure!(target_power > 0, Error::<T>::ZeroPower);
        ensure!(amount > 0, Error::<T>::ZeroAmount);
        let capacity = Self::stake_for(target_power)?;
        ensure!(amount <= capacity, Error::<T>::ExceedsCapacity);

        let group_buying_id = NextGroupBuyingId::<T>::get();
        let next = group_buying_id
            .checked_add(1)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        if amount == capacity {
            Self::ensure_slot_available()?;
        }

        T::Currency::transfer(
            who,
            &Self::account_id(),
            amount,
            ExistenceRequirement::AllowDeath,
        )?;

        let mut round = GroupBuying {
            target_power,
            slices_left: capacity - amount,
            buyers: 1,
            pool_id: None,
        };
        GroupBuyingSlices::<T>::insert(group_buying_id, who, amount);
        NextGroupBuyingId::<T>::put(next);

        Self::deposit_event(Event::GroupBuyingSuggested {
            who: who.clone(),
            group_buying_id,
            amount,
        });

        if round.slices_left == 0 {
            Self::complete_group_buying(group_buying_id, &mut round)?;
        }
        GroupBuyings::<T>::insert(group_buying_id, round);
        Ok(())
    }

    pub(crate) fn do_participate_in_group_buying(
        who: &T::AccountId,
        group_buying_id: GroupBuyingId,
        amount: u128,
    ) -> DispatchResult {
        let mut round =
            GroupBuyings::<T>::get(group_buying_id).ok_or(Error::<T>::GroupBuyingNotFound)?;
        ensure!(!round.is_completed(), Error::<T>::AlreadyStarted);
        ensure!(amount > 0, Error::<T>::ZeroAmount);
        ensure!(amount <= round.slices_left, Error::<T>::ExceedsCapacity);

        let current = GroupBuyingSlices::<T>::get(group_buying_id, who);
        if current == 0 {
            ensure!(
                round.buyers < T::MaxGroupBuyers::get(),
                Error::<T>::TooManyGroupBuyers
            );
        }
        if amount == round.slices_left {
            Self::ensure_slot_available()?;
        }
        let total = current
            .checked_add(amount)
            .ok_or(Error::<T>::ArithmeticOverflow)?;

        T::Currency::transfer(
            who,
            &Self::account_id(),
            amount,
            ExistenceRequirement::AllowDeath,
        )?;

        if current == 0 {
            round.buyers += 1;
        }
        round.slices_left -= amount;
        GroupBuyingSlices::<T>::insert(group_buying_id, who, total);

        Self::deposit_event(Event::GroupBuyingUpdated {
            who: who.clone(),
            group_buying_id,
            amount: total,
        });

        if round.slices_left == 0 {
            Self::complete_group_buying(group_buying_id, &mut round)?;
        }
        GroupBuyings::<T>::insert(group_buying_id, round);
        Ok(())
    }

    pub(crate) fn do_withdraw_group_buying(
        who: &T::AccountId,
        group_buying_id: GroupBuyingId,
        amount: u128,
    ) -> DispatchResult {
        let mut round =
            GroupBuyings::<T>::get(group_buying_id).ok_or(Error::<T>::GroupBuyingNotFound)?;
        ensure!(!round.is_completed(), Error::<T>::AlreadyStarted);
        ensure!(amount > 0, Error::<T>::ZeroAmount);

        let current = GroupBuyingSlices::<T>::get(group_buying_id, who);
        ensure!(amount <= current, Error::<T>::ExceedsContribution);
        let slices_left = round
            .slices_left
            .checked_add(amount)
            .ok_or(Error::<T>::ArithmeticOverflow)?;

        T::Currency::transfer(
            &Self::account_id(),
            who,
            amount,
            ExistenceRequirement::AllowDeath,
        )?;

        let remaining = current - amount;
        if remaining == 0 {
            GroupBuyingSlices::<T>::remove(group_buying_id, who);
            round.buyers = round.buyers.saturating_sub(1);
        } else {
            GroupBuyingSlices::<T>::insert(group_buying_id, who, remaining);
        }
        round.slices_left = slices_left;
        GroupBuyings::<T>::insert(group_buying_id, round);

        Self::deposit_event(Event::GroupBuyingUpdated {
            who: who.clone(),
            group_buying_id,
            amount: remaining,
        });
        Ok(())
    }

    /// Contributions already cover the stake, so only the pool and slices are minted.
    fn complete_group_buying(
        group_buying_id: GroupBuyingId,
        round: &mut GroupBuying,
    ) -> DispatchResult {
        let (pool_id, title_id) = Self::do_create_pool(&Self::account_id(), round.target_power)?;

        let contributions: Vec<(T::AccountId, u128)> =
            GroupBuyingSlices::<T>::iter_prefix(group_buying_id).collect();
        for (buyer, amount) in contributions.iter() {
            Self::mint_slices(title_id, buyer, *amount, 0)?;
        }

        round.pool_id = Some(pool_id);
        Self::deposit_event(Event::GroupBuyingCompleted { group_buying_id, pool_id });
        log::info!(
            target: LOG_TARGET,
            "group buying {} completed into pool {} with {} contributors",
            group_buying_id,
            pool_id,
            contributions.len()
        );
        Ok(())
    }
}
