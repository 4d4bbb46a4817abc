//! # Slice Pool Pallet
//!
//! Pooled mining-reward accounting on top of a virtual-bitcoin issuance curve.
//!
//! - A **pool** stakes mining power (1 power = `SlicesPerPower` tokens) and
//!   earns the subsidy in proportion to its share of total power.
//! - A pool's reward stream is split into fungible **slices**
//!   (`power * SlicesPerPower` of them); holders earn per slice.
//! - The pool's **title** is a separate, non-fractional token: only its holder
//!   may resize or delete the pool.
//! - Slices trade through fixed-price, partial-fill listings.
//! - **Group buying** crowdfunds a pool; the completing contribution creates
//!   the pool and mints every contributor their slices in the same call.
//!
//! ## Accounting
//!
//! Reward is settled lazily. Every call that touches a pool first brings its
//! per-slice accumulator up to the current block, in O(1) regardless of the
//! number of elapsed blocks, using total power as of settlement time. Every
//! change to a holder's position first rolls their accrued reward into
//! `unclaimed` and snaps their debt to the accumulator, so slices never earn
//! for blocks before they were held.
//!
//! The sovereign account is endowed with the existential deposit at genesis;
//! runtimes adding this pallet to a live chain must fund it the same way.
//!
//! Slice positions are keyed by title id, which is never reused. Pool storage
//! slots are recycled through a free list; deleting a pool freezes its
//! accumulator under the title so remaining holders can still claim.

#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

mod accrual;
mod group_buying;
mod ledger;
mod market;
mod slices;
pub mod types;

#[cfg(test)]
mod mock;

pub use slicepool_primitives::SubsidySource;

pub(crate) const LOG_TARGET: &str = "runtime::slice-pool";

#[frame_support::pallet]
pub mod pallet {
    use frame_support::{
        pallet_prelude::*,
        traits::{Currency, ExistenceRequirement},
        PalletId,
    };
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::AccountIdConversion;

    use crate::types::{GroupBuying, Pool, Sale, SliceAccount};
    use slicepool_primitives::{
        Balance, GroupBuyingId, PoolId, Power, SaleId, SubsidySource, TitleId,
    };

    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching event type
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Token used for stakes, slice payments and rewards
        type Currency: Currency<Self::AccountId, Balance = Balance>;

        /// Issuance schedule rewards are drawn from
        type Subsidy: SubsidySource<Self::AccountId>;

        /// Sovereign account holding stakes and group-buy contributions
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Slices minted per unit of power (and token stake per unit of power)
        #[pallet::constant]
        type SlicesPerPower: Get<u128>;

        /// Max pool storage slots
        #[pallet::constant]
        type MaxPools: Get<u32>;

        /// Max distinct contributors in one group-buying round
        #[pallet::constant]
        type MaxGroupBuyers: Get<u32>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// Live pools by storage slot
    #[pallet::storage]
    #[pallet::getter(fn pool)]
    pub type Pools<T: Config> = StorageMap<_, Twox64Concat, PoolId, Pool, OptionQuery>;

    /// Number of slots ever allocated
    #[pallet::storage]
    #[pallet::getter(fn pool_count)]
    pub type PoolCount<T: Config> = StorageValue<_, u32, ValueQuery>;

    /// Slots released by deleted pools, reused before new ones are appended
    #[pallet::storage]
    #[pallet::getter(fn free_pool_ids)]
    pub type FreePoolIds<T: Config> =
        StorageValue<_, BoundedVec<PoolId, T::MaxPools>, ValueQuery>;

    /// Highest title id minted so far (titles start at 1)
    #[pallet::storage]
    #[pallet::getter(fn last_title_id)]
    pub type LastTitleId<T: Config> = StorageValue<_, TitleId, ValueQuery>;

    /// Current holder of each live title
    #[pallet::storage]
    #[pallet::getter(fn title_holder)]
    pub type TitleHolders<T: Config> =
        StorageMap<_, Twox64Concat, TitleId, T::AccountId, OptionQuery>;

    /// Slot of the pool a live title controls
    #[pallet::storage]
    #[pallet::getter(fn pool_of_title)]
    pub type TitleToPool<T: Config> = StorageMap<_, Twox64Concat, TitleId, PoolId, OptionQuery>;

    /// Final accumulator of deleted pools
    #[pallet::storage]
    #[pallet::getter(fn retired_accumulator)]
    pub type RetiredAccumulators<T: Config> =
        StorageMap<_, Twox64Concat, TitleId, u128, OptionQuery>;

    /// Sum of power over all live pools
    #[pallet::storage]
    #[pallet::getter(fn total_power)]
    pub type TotalPower<T: Config> = StorageValue<_, u128, ValueQuery>;

    /// Slice positions by (title, holder)
    #[pallet::storage]
    #[pallet::getter(fn slice_account)]
    pub type Slices<T: Config> = StorageDoubleMap<
        _,
        Twox64Concat,
        TitleId,
        Blake2_128Concat,
        T::AccountId,
        SliceAccount,
        ValueQuery,
    >;

    /// Open listings
    #[pallet::storage]
    #[pallet::getter(fn sale)]
    pub type Sales<T: Config> =
        StorageMap<_, Twox64Concat, SaleId, Sale<T::AccountId>, OptionQuery>;

    #[pallet::storage]
    #[pallet::getter(fn next_sale_id)]
    pub type NextSaleId<T: Config> = StorageValue<_, SaleId, ValueQuery>;

    /// Group-buying rounds, open and completed
    #[pallet::storage]
    #[pallet::getter(fn group_buying)]
    pub type GroupBuyings<T: Config> =
        StorageMap<_, Twox64Concat, GroupBuyingId, GroupBuying, OptionQuery>;

    /// Slice-equivalent contribution of each participant
    #[pallet::storage]
    #[pallet::getter(fn group_buying_slices)]
    pub type GroupBuyingSlices<T: Config> = StorageDoubleMap<
        _,
        Twox64Concat,
        GroupBuyingId,
        Blake2_128Concat,
        T::AccountId,
        u128,
        ValueQuery,
    >;

    #[pallet::storage]
    #[pallet::getter(fn next_group_buying_id)]
    pub type NextGroupBuyingId<T: Config> = StorageValue<_, GroupBuyingId, ValueQuery>;

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        #[serde(skip)]
        pub _phantom: core::marker::PhantomData<T>,
    }

    /// Endows the sovereign account with the existential deposit, which is never paid out.
    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            let account_id = Pallet::<T>::account_id();
            let min = T::Currency::minimum_balance();
            if T::Currency::free_balance(&account_id) < min {
                let _ = T::Currency::make_free_balance_be(&account_id, min);
            }
        }
    }

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Pool created; `title_holder` is the pallet account for group-bought pools
        PoolCreated {
            pool_id: PoolId,
            title_holder: T::AccountId,
            title_id: TitleId,
            power: Power,
        },
        PoolChanged {
            pool_id: PoolId,
            title_id: TitleId,
            old_power: Power,
            new_power: Power,
        },
        PoolDeleted {
            pool_id: PoolId,
            title_id: TitleId,
            refund: Balance,
        },
        TitleTransferred {
            pool_id: PoolId,
            title_id: TitleId,
            from: T::AccountId,
            to: T::AccountId,
        },
        /// Reward paid to a slice holder
        Mined {
            title_id: TitleId,
            who: T::AccountId,
            amount: Balance,
        },
        SaleCreated {
            sale_id: SaleId,
            seller: T::AccountId,
            pool_id: PoolId,
            slices: u128,
            price: Balance,
        },
        SaleCancelled { sale_id: SaleId },
        Bought {
            sale_id: SaleId,
            buyer: T::AccountId,
            slices: u128,
            price: Balance,
        },
        /// Listing fully filled and removed
        SaleRemoved { sale_id: SaleId },
        GroupBuyingSuggested {
            who: T::AccountId,
            group_buying_id: GroupBuyingId,
            amount: u128,
        },
        /// `amount` is the contributor's new total
        GroupBuyingUpdated {
            who: T::AccountId,
            group_buying_id: GroupBuyingId,
            amount: u128,
        },
        GroupBuyingCompleted {
            group_buying_id: GroupBuyingId,
            pool_id: PoolId,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// Caller does not hold the pool's title
        NotTitleHolder,
        /// Caller did not create the listing
        NotSeller,
        /// Power must be non-zero
        ZeroPower,
        /// New power equals current power
        PowerUnchanged,
        /// Amount must be non-zero
        ZeroAmount,
        /// Not enough spendable slices
        InsufficientSlices,
        /// More slices than the listing has left
        ExceedsListing,
        /// More than the caller contributed
        ExceedsContribution,
        /// More than the round has left
        ExceedsCapacity,
        /// All pool slots are taken
        TooManyPools,
        /// Round has reached its contributor limit
        TooManyGroupBuyers,
        /// No live pool at this id
        PoolNotFound,
        /// No open listing at this id
        SaleNotFound,
        /// No round at this id
        GroupBuyingNotFound,
        /// Title belongs to no deleted pool
        TitleNotRetired,
        /// Round already completed
        AlreadyStarted,
        /// Arithmetic overflow
        ArithmeticOverflow,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Stake `power` into a new pool and receive all of its slices and its title.
        #[pallet::call_index(0)]
        #[pallet::weight(Weight::from_parts(60_000_000, 0))]
        pub fn create_pool(origin: OriginFor<T>, power: Power) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(power > 0, Error::<T>::ZeroPower);
            Self::ensure_slot_available()?;

            let stake = Self::stake_for(power)?;
            T::Currency::transfer(
                &who,
                &Self::account_id(),
                stake,
                ExistenceRequirement::AllowDeath,
            )?;

            let (_, title_id) = Self::do_create_pool(&who, power)?;
            Self::mint_slices(title_id, &who, stake, 0)
        }

        /// Resize a pool. Growing stakes more tokens and mints slices to the caller;
        /// shrinking refunds stake and burns the caller's own slices.
        #[pallet::call_index(1)]
        #[pallet::weight(Weight::from_parts(70_000_000, 0))]
        pub fn change_pool(origin: OriginFor<T>, pool_id: PoolId, power: Power) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_change_pool(&who, pool_id, power)
        }

        /// Delete a pool: refund the stake, pay the caller's reward, burn the
        /// caller's slices and free the slot. Other holders keep their claims.
        #[pallet::call_index(2)]
        #[pallet::weight(Weight::from_parts(80_000_000, 0))]
        pub fn delete_pool(origin: OriginFor<T>, pool_id: PoolId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_delete_pool(&who, pool_id)
        }

        /// Hand the pool's title to another account.
        #[pallet::call_index(3)]
        #[pallet::weight(Weight::from_parts(30_000_000, 0))]
        pub fn transfer_title(
            origin: OriginFor<T>,
            pool_id: PoolId,
            to: T::AccountId,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_transfer_title(&who, pool_id, to)
        }

        /// Claim up to `limit` of the caller's reward in a live pool.
        /// `Balance::MAX` claims everything.
        #[pallet::call_index(4)]
        #[pallet::weight(Weight::from_parts(50_000_000, 0))]
        pub fn mine(origin: OriginFor<T>, pool_id: PoolId, limit: Balance) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_mine(&who, pool_id, limit)
        }

        /// Claim up to `limit` of the reward earned in a pool before it was deleted.
        #[pallet::call_index(5)]
        #[pallet::weight(Weight::from_parts(50_000_000, 0))]
        pub fn mine_retired(
            origin: OriginFor<T>,
            title_id: TitleId,
            limit: Balance,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_mine_retired(&who, title_id, limit)
        }

        /// List `slices` for `price` in total.
        #[pallet::call_index(6)]
        #[pallet::weight(Weight::from_parts(50_000_000, 0))]
        pub fn sell(
            origin: OriginFor<T>,
            pool_id: PoolId,
            slices: u128,
            price: Balance,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_sell(&who, pool_id, slices, price)
        }

        #[pallet::call_index(7)]
        #[pallet::weight(Weight::from_parts(40_000_000, 0))]
        pub fn cancel_sale(origin: OriginFor<T>, sale_id: SaleId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_cancel_sale(&who, sale_id)
        }

        /// Buy `slices` from a listing at its pro-rata price.
        #[pallet::call_index(8)]
        #[pallet::weight(Weight::from_parts(70_000_000, 0))]
        pub fn buy(origin: OriginFor<T>, sale_id: SaleId, slices: u128) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_buy(&who, sale_id, slices)
        }

        /// Open a round targeting `target_power`, contributing `amount` slice-equivalents.
        #[pallet::call_index(9)]
        #[pallet::weight(crate::group_buying::completion_weight::<T>())]
        pub fn suggest_group_buying(
            origin: OriginFor<T>,
            target_power: Power,
            amount: u128,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_suggest_group_buying(&who, target_power, amount)
        }

        /// Contribute to an open round. The contribution that fills the round creates the pool.
        #[pallet::call_index(10)]
        #[pallet::weight(crate::group_buying::completion_weight::<T>())]
        pub fn participate_in_group_buying(
            origin: OriginFor<T>,
            group_buying_id: GroupBuyingId,
            amount: u128,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_participate_in_group_buying(&who, group_buying_id, amount)
        }

        /// Take back part of a contribution while the round is open.
        #[pallet::call_index(11)]
        #[pallet::weight(Weight::from_parts(40_000_000, 0))]
        pub fn withdraw_group_buying(
            origin: OriginFor<T>,
            group_buying_id: GroupBuyingId,
            amount: u128,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_withdraw_group_buying(&who, group_buying_id, amount)
        }
    }

    impl<T: Config> Pallet<T> {
        /// Account holding stakes and contributions
        pub fn account_id() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        /// Token stake (and slice count) backing `power`
        pub fn stake_for(power: Power) -> Result<u128, DispatchError> {
            (power as u128)
                .checked_mul(T::SlicesPerPower::get())
                .ok_or_else(|| Error::<T>::ArithmeticOverflow.into())
        }
    }
}
