//! Slice ledger.
//!
//! Every balance change reconciles the affected holder against the pool's
//! accumulator first, using the balance held before the change.

use frame_support::pallet_prelude::*;

use crate::{
    pallet::{Config, Error, Pallet, Slices},
    types::SliceAccount,
};
use slicepool_primitives::{PoolId, TitleId};

impl<T: Config> Pallet<T> {
    /// Write `account` back, dropping it once it holds nothing.
    pub(crate) fn put_slice_account(title_id: TitleId, who: &T::AccountId, account: SliceAccount) {
        if account.is_empty() {
            Slices::<T>::remove(title_id, who);
        } else {
            Slices::<T>::insert(title_id, who, account);
        }
    }

    pub(crate) fn mint_slices(
        title_id: TitleId,
        who: &T::AccountId,
        amount: u128,
        acc: u128,
    ) -> DispatchResult {
        let mut account = Self::slice_account(title_id, who);
        Self::reconcile(&mut account, acc)?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        Self::put_slice_account(title_id, who, account);
        Ok(())
    }

    /// Burn from the spendable balance only; escrowed slices are untouched.
    pub(crate) fn burn_slices(
        title_id: TitleId,
        who: &T::AccountId,
        amount: u128,
        acc: u128,
    ) -> DispatchResult {
        let mut account = Self::slice_account(title_id, who);
        ensure!(account.balance >= amount, Error::<T>::InsufficientSlices);
        Self::reconcile(&mut account, acc)?;
        account.balance -= amount;
        Self::put_slice_account(title_id, who, account);
        Ok(())
    }

    /// Spendable slices of `who` in the live pool at `pool_id`.
    pub fn slices_of(pool_id: PoolId, who: &T::AccountId) -> u128 {
        Self::pool(pool_id)
            .map(|pool| Self::slice_account(pool.title_id, who).balance)
            .unwrap_or(0)
    }

    /// Slices of `who` currently listed for sale in the live pool at `pool_id`.
    pub fn escrowed_of(pool_id: PoolId, who: &T::AccountId) -> u128 {
        Self::pool(pool_id)
            .map(|pool| Self::slice_account(pool.title_id, who).escrowed)
            .unwrap_or(0)
    }
}
