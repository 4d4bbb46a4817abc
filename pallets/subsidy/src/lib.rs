//! # Subsidy Pallet
//!
//! Issuance source for slice pools, following the virtual-bitcoin curve:
//! - 25 VBTC per block from height 1
//! - Halving every 420,000 blocks
//! - Total payout capped at 21,000,000 VBTC
//!
//! Nothing is minted per block. Consumers read the schedule through
//! [`SubsidySource`] and claim what they have accounted for; each claim
//! issues fresh currency to the claimant.

#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

use slicepool_primitives::{Balance, BlockNumber, SubsidySource};

#[frame_support::pallet]
pub mod pallet {
    use frame_support::{
        pallet_prelude::*,
        traits::{Currency, Imbalance},
    };
    use frame_system::pallet_prelude::*;

    use slicepool_primitives::{
        current_era, emission_info, subsidy_at, Balance, EmissionInfo, MAX_SUPPLY,
    };

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;
        type Currency: Currency<Self::AccountId, Balance = Balance>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// Current halving era (0 = first era, 1 = after first halving, etc.)
    #[pallet::storage]
    #[pallet::getter(fn current_halving_era)]
    pub type CurrentHalvingEra<T: Config> = StorageValue<_, u32, ValueQuery>;

    /// Total issued through claims
    #[pallet::storage]
    #[pallet::getter(fn total_claimed)]
    pub type TotalClaimed<T: Config> = StorageValue<_, Balance, ValueQuery>;

    /// True once the cap was hit and EmissionComplete was emitted.
    #[pallet::storage]
    #[pallet::getter(fn emission_finished)]
    pub type EmissionFinished<T: Config> = StorageValue<_, bool, ValueQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Reward issued against the schedule
        SubsidyClaimed { who: T::AccountId, amount: Balance },
        /// Halving occurred
        HalvingOccurred {
            era: u32,
            new_subsidy: Balance,
            at_block: BlockNumberFor<T>,
        },
        /// Claims reached the supply cap
        EmissionComplete {
            total_claimed: Balance,
            at_block: BlockNumberFor<T>,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// Claim would exceed the supply cap
        EmissionComplete,
        /// Claim too small to create the receiving account
        BelowMinimumBalance,
        /// Arithmetic overflow
        ArithmeticOverflow,
    }

    #[pallet::hooks]
    impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
        fn on_initialize(block_number: BlockNumberFor<T>) -> Weight {
            let block_u32: u32 = block_number.try_into().unwrap_or(u32::MAX);

            let expected_era = current_era(block_u32);
            if expected_era > Self::current_halving_era() {
                CurrentHalvingEra::<T>::put(expected_era);

                let new_subsidy = subsidy_at(block_u32);
                log::info!(
                    target: "runtime::subsidy",
                    "halving to era {} at block {}, subsidy now {}",
                    expected_era,
                    block_u32,
                    new_subsidy
                );
                Self::deposit_event(Event::HalvingOccurred {
                    era: expected_era,
                    new_subsidy,
                    at_block: block_number,
                });
            }

            Weight::from_parts(5_000, 0)
        }
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {}

    impl<T: Config> Pallet<T> {
        /// Issue `amount` to `who`, refusing anything past the supply cap.
        pub fn issue(who: &T::AccountId, amount: Balance) -> DispatchResult {
            if amount == 0 {
                return Ok(());
            }
            ensure!(!Self::emission_finished(), Error::<T>::EmissionComplete);

            let total = Self::total_claimed()
                .checked_add(amount)
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            ensure!(total <= MAX_SUPPLY, Error::<T>::EmissionComplete);

            let issued = T::Currency::deposit_creating(who, amount);
            ensure!(issued.peek() == amount, Error::<T>::BelowMinimumBalance);
            TotalClaimed::<T>::put(total);

            Self::deposit_event(Event::SubsidyClaimed { who: who.clone(), amount });
            log::debug!(target: "runtime::subsidy", "issued {} (total {})", amount, total);

            if total == MAX_SUPPLY {
                EmissionFinished::<T>::put(true);
                Self::deposit_event(Event::EmissionComplete {
                    total_claimed: total,
                    at_block: <frame_system::Pallet<T>>::block_number(),
                });
            }
            Ok(())
        }

        /// What is still left to issue before the cap
        pub fn remaining_supply() -> Balance {
            MAX_SUPPLY.saturating_sub(Self::total_claimed())
        }

        /// Get current block subsidy (for UI/RPC)
        pub fn get_current_subsidy() -> Balance {
            let block_number = <frame_system::Pallet<T>>::block_number();
            let block_u32: u32 = block_number.try_into().unwrap_or(0);
            subsidy_at(block_u32)
        }

        /// Get emission info at the current block
        pub fn emission_info() -> EmissionInfo {
            let block_number = <frame_system::Pallet<T>>::block_number();
            let block_u32: u32 = block_number.try_into().unwrap_or(0);
            emission_info(block_u32)
        }
    }
}

impl<T: Config> SubsidySource<T::AccountId> for Pallet<T> {
    fn subsidy_at(height: BlockNumber) -> Balance {
        slicepool_primitives::subsidy_at(height)
    }

    fn cumulative_subsidy(from: BlockNumber, to: BlockNumber) -> Balance {
        slicepool_primitives::cumulative_subsidy(from, to)
    }

    fn claim(who: &T::AccountId, amount: Balance) -> sp_runtime::DispatchResult {
        Self::issue(who, amount)
    }
}
