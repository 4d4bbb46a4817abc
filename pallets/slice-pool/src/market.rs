//! Fixed-price slice listings with partial fills.
//!
//! Listed slices leave the seller's spendable balance but keep earning for
//! the seller until bought. A fill charges `price * amount / slices` of what is
//! left on the listing; the fill that empties it pays the whole remainder, so
//! the listed total is collected exactly.

use frame_support::{
    pallet_prelude::*,
    traits::{Currency, ExistenceRequirement},
};

use crate::{
    accrual::mul_div,
    pallet::{Config, Error, Event, NextSaleId, Pallet, Pools, Sales, TitleToPool},
    types::Sale,
};
use slicepool_primitives::{Balance, PoolId, SaleId};

impl<T: Config> Pallet<T> {
    pub(crate) fn do_sell(
        who: &T::AccountId,
        pool_id: PoolId,
        slices: u128,
        price: Balance,
    ) -> DispatchResult {
        ensure!(slices > 0, Error::<T>::ZeroAmount);
        let pool = Self::settled_pool(pool_id)?;
        let title_id = pool.title_id;

        let mut account = Self::slice_account(title_id, who);
        ensure!(account.balance >= slices, Error::<T>::InsufficientSlices);
        Self::reconcile(&mut account, pool.acc_reward_per_slice)?;
        account.balance -= slices;
        account.escrowed = account
            .escrowed
            .checked_add(slices)
            .ok_or(Error::<T>::ArithmeticOverflow)?;

        let sale_id = NextSaleId::<T>::get();
        let next = sale_id.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?;

        Pools::<T>::insert(pool_id, pool);
        Self::put_slice_account(title_id, who, account);
        Sales::<T>::insert(
            sale_id,
            Sale {
                seller: who.clone(),
                pool_id,
                title_id,
                slices,
                price,
            },
        );
        NextSaleId::<T>::put(next);

        Self::deposit_event(Event::SaleCreated {
            sale_id,
            seller: who.clone(),
            pool_id,
            slices,
            price,
        });
        Ok(())
    }

    /// Return escrow to the seller. Works for listings of deleted pools too.
    pub(crate) fn do_cancel_sale(who: &T::AccountId, sale_id: SaleId) -> DispatchResult {
        let sale = Sales::<T>::get(sale_id).ok_or(Error::<T>::SaleNotFound)?;
        ensure!(sale.seller == *who, Error::<T>::NotSeller);

        let (acc, live) = Self::title_accumulator(sale.title_id)?;
        let mut account = Self::slice_account(sale.title_id, who);
        Self::reconcile(&mut account, acc)?;
        account.escrowed = account
            .escrowed
            .checked_sub(sale.slices)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        account.balance = account
            .balance
            .checked_add(sale.slices)
            .ok_or(Error::<T>::ArithmeticOverflow)?;

        if let Some((pool_id, pool)) = live {
            Pools::<T>::insert(pool_id, pool);
        }
        Self::put_slice_account(sale.title_id, who, account);
        Sales::<T>::remove(sale_id);

        Self::deposit_event(Event::SaleCancelled { sale_id });
        Ok(())
    }

    pub(crate) fn do_buy(who: &T::AccountId, sale_id: SaleId, slices: u128) -> DispatchResult {
        ensure!(slices > 0, Error::<T>::ZeroAmount);
        let mut sale = Sales::<T>::get(sale_id).ok_or(Error::<T>::SaleNotFound)?;
        ensure!(slices <= sale.slices, Error::<T>::ExceedsListing);

        let pool_id = TitleToPool::<T>::get(sale.title_id).ok_or(Error::<T>::PoolNotFound)?;
        let pool = Self::settled_pool(pool_id)?;
        let acc = pool.acc_reward_per_slice;
        let title_id = sale.title_id;

        let price = if slices == sale.slices {
            sale.price
        } else {
            mul_div(sale.price, slices, sale.slices).ok_or(Error::<T>::ArithmeticOverflow)?
        };

        let mut seller_account = Self::slice_account(title_id, &sale.seller);
        Self::reconcile(&mut seller_account, acc)?;
        seller_account.escrowed = seller_account
            .escrowed
            .checked_sub(slices)
            .ok_or(Error::<T>::ArithmeticOverflow)?;

        let buyer_account = if *who == sale.seller {
            seller_account.balance = seller_account
                .balance
                .checked_add(slices)
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            None
        } else {
            let mut account = Self::slice_account(title_id, who);
            Self::reconcile(&mut account, acc)?;
            account.balance = account
                .balance
                .checked_add(slices)
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            Some(account)
        };

        T::Currency::transfer(who, &sale.seller, price, ExistenceRequirement::AllowDeath)?;

        Pools::<T>::insert(pool_id, pool);
        Self::put_slice_account(title_id, &sale.seller, seller_account);
        if let Some(account) = buyer_account {
            Self::put_slice_account(title_id, who, account);
        }

        sale.slices -= slices;
        sale.price = sale.price.saturating_sub(price);

        Self::deposit_event(Event::Bought {
            sale_id,
            buyer: who.clone(),
            slices,
            price,
        });

        if sale.slices == 0 {
            Sales::<T>::remove(sale_id);
            Self::deposit_event(Event::SaleRemoved { sale_id });
        } else {
            Sales::<T>::insert(sale_id, sale);
        }
        Ok(())
    }
}
