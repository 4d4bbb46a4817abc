//! Pool ledger: slots, titles and power.

use frame_support::{
    pallet_prelude::*,
    traits::{Currency, ExistenceRequirement},
};

use crate::{
    pallet::{
        Config, Error, Event, FreePoolIds, LastTitleId, Pallet, PoolCount, Pools,
        RetiredAccumulators, TitleHolders, TitleToPool, TotalPower,
    },
    types::Pool,
    LOG_TARGET,
};
use slicepool_primitives::{Balance, PoolId, Power, TitleId};

impl<T: Config> Pallet<T> {
    pub(crate) fn ensure_slot_available() -> DispatchResult {
        ensure!(
            !FreePoolIds::<T>::get().is_empty() || PoolCount::<T>::get() < T::MaxPools::get(),
            Error::<T>::TooManyPools
        );
        Ok(())
    }

    /// Reuse the most recently freed slot, else append one.
    fn take_slot() -> Result<PoolId, DispatchError> {
        let mut free = FreePoolIds::<T>::get();
        if let Some(pool_id) = free.pop() {
            FreePoolIds::<T>::put(free);
            return Ok(pool_id);
        }
        let count = PoolCount::<T>::get();
        ensure!(count < T::MaxPools::get(), Error::<T>::TooManyPools);
        PoolCount::<T>::put(count + 1);
        Ok(count)
    }

    fn release_slot(pool_id: PoolId) -> DispatchResult {
        FreePoolIds::<T>::try_mutate(|free| {
            free.try_push(pool_id).map_err(|_| Error::<T>::TooManyPools)
        })?;
        Ok(())
    }

    pub(crate) fn ensure_title_holder(who: &T::AccountId, title_id: TitleId) -> DispatchResult {
        ensure!(
            TitleHolders::<T>::get(title_id).as_ref() == Some(who),
            Error::<T>::NotTitleHolder
        );
        Ok(())
    }

    /// Allocate a slot and mint a title for a new pool. Stake and slices are
    /// the caller's business.
    pub(crate) fn do_create_pool(
        holder: &T::AccountId,
        power: Power,
    ) -> Result<(PoolId, TitleId), DispatchError> {
        let title_id = LastTitleId::<T>::get()
            .checked_add(1)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        let total_power = TotalPower::<T>::get()
            .checked_add(power as u128)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        let pool_id = Self::take_slot()?;

        LastTitleId::<T>::put(title_id);
        Pools::<T>::insert(
            pool_id,
            Pool {
                title_id,
                power,
                last_settled_height: Self::now(),
                acc_reward_per_slice: 0,
            },
        );
        TitleHolders::<T>::insert(title_id, holder);
        TitleToPool::<T>::insert(title_id, pool_id);
        TotalPower::<T>::put(total_power);

        Self::deposit_event(Event::PoolCreated {
            pool_id,
            title_holder: holder.clone(),
            title_id,
            power,
        });
        log::info!(
            target: LOG_TARGET,
            "pool {} created with power {} (title {})",
            pool_id,
            power,
            title_id
        );

        Ok((pool_id, title_id))
    }

    pub(crate) fn do_change_pool(
        who: &T::AccountId,
        pool_id: PoolId,
        power: Power,
    ) -> DispatchResult {
        ensure!(power > 0, Error::<T>::ZeroPower);
        let mut pool = Self::pool(pool_id).ok_or(Error::<T>::PoolNotFound)?;
        Self::ensure_title_holder(who, pool.title_id)?;
        ensure!(power != pool.power, Error::<T>::PowerUnchanged);

        Self::settle(&mut pool)?;
        let acc = pool.acc_reward_per_slice;
        let old_power = pool.power;
        let total_power = TotalPower::<T>::get();

        let new_total = if power > old_power {
            let delta = Self::stake_for(power - old_power)?;
            let new_total = total_power
                .checked_add((power - old_power) as u128)
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            T::Currency::transfer(
                who,
                &Self::account_id(),
                delta,
                ExistenceRequirement::AllowDeath,
            )?;
            Self::mint_slices(pool.title_id, who, delta, acc)?;
            new_total
        } else {
            let delta = Self::stake_for(old_power - power)?;
            ensure!(
                Self::slice_account(pool.title_id, who).balance >= delta,
                Error::<T>::InsufficientSlices
            );
            T::Currency::transfer(
                &Self::account_id(),
                who,
                delta,
                ExistenceRequirement::AllowDeath,
            )?;
            Self::burn_slices(pool.title_id, who, delta, acc)?;
            total_power.saturating_sub((old_power - power) as u128)
        };

        pool.power = power;
        let title_id = pool.title_id;
        Pools::<T>::insert(pool_id, pool);
        TotalPower::<T>::put(new_total);

        Self::deposit_event(Event::PoolChanged {
            pool_id,
            title_id,
            old_power,
            new_power: power,
        });
        Ok(())
    }

    pub(crate) fn do_delete_pool(who: &T::AccountId, pool_id: PoolId) -> DispatchResult {
        let mut pool = Self::pool(pool_id).ok_or(Error::<T>::PoolNotFound)?;
        Self::ensure_title_holder(who, pool.title_id)?;

        Self::settle(&mut pool)?;
        let title_id = pool.title_id;
        let acc = pool.acc_reward_per_slice;
        let refund: Balance = Self::stake_for(pool.power)?;

        let mut account = Self::slice_account(title_id, who);
        Self::reconcile(&mut account, acc)?;
        // holder account must exist before the reward is issued
        T::Currency::transfer(
            &Self::account_id(),
            who,
            refund,
            ExistenceRequirement::AllowDeath,
        )?;
        Self::pay_out(who, title_id, &mut account, Balance::MAX)?;

        account.balance = 0;
        Self::put_slice_account(title_id, who, account);

        TotalPower::<T>::mutate(|total| *total = total.saturating_sub(pool.power as u128));
        Pools::<T>::remove(pool_id);
        TitleToPool::<T>::remove(title_id);
        TitleHolders::<T>::remove(title_id);
        RetiredAccumulators::<T>::insert(title_id, acc);
        Self::release_slot(pool_id)?;

        Self::deposit_event(Event::PoolDeleted { pool_id, title_id, refund });
        log::info!(
            target: LOG_TARGET,
            "pool {} deleted (title {}), refunded {}",
            pool_id,
            title_id,
            refund
        );
        Ok(())
    }

    pub(crate) fn do_transfer_title(
        who: &T::AccountId,
        pool_id: PoolId,
        to: T::AccountId,
    ) -> DispatchResult {
        let pool = Self::pool(pool_id).ok_or(Error::<T>::PoolNotFound)?;
        Self::ensure_title_holder(who, pool.title_id)?;

        TitleHolders::<T>::insert(pool.title_id, &to);
        Self::deposit_event(Event::TitleTransferred {
            pool_id,
            title_id: pool.title_id,
            from: who.clone(),
            to,
        });
        Ok(())
    }
}
