use crate as pallet_slice_pool;
use frame_support::{
    derive_impl, parameter_types,
    traits::{ConstU32, Hooks},
    PalletId,
};
use slicepool_primitives::SLICES_PER_POWER;
use sp_runtime::{traits::IdentityLookup, BuildStorage};

type Block = frame_system::mocking::MockBlock<Test>;

pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const CAROL: u64 = 3;
pub const DAVE: u64 = 4;
/// Funded with exactly `EVE_BALANCE`, so spending it all reaps the account
pub const EVE: u64 = 5;
pub const EVE_BALANCE: u128 = 1_000;

/// Starting balance of every funded test account
pub const INITIAL_BALANCE: u128 = 10_000_000;

parameter_types! {
    pub const ExistentialDeposit: u128 = 100;
}

frame_support::construct_runtime!(
    pub enum Test {
        System: frame_system,
        Balances: pallet_balances,
        Subsidy: pallet_subsidy,
        SlicePool: pallet_slice_pool,
    }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
    type Block = Block;
    type AccountId = u64;
    type Lookup = IdentityLookup<Self::AccountId>;
    type AccountData = pallet_balances::AccountData<u128>;
}

#[derive_impl(pallet_balances::config_preludes::TestDefaultConfig)]
impl pallet_balances::Config for Test {
    type Balance = u128;
    type ExistentialDeposit = ExistentialDeposit;
    type AccountStore = System;
}

impl pallet_subsidy::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Currency = Balances;
}

parameter_types! {
    pub const SlicePoolPalletId: PalletId = PalletId(*b"py/slice");
    pub const SlicesPerPower: u128 = SLICES_PER_POWER;
}

impl pallet_slice_pool::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Currency = Balances;
    type Subsidy = Subsidy;
    type PalletId = SlicePoolPalletId;
    type SlicesPerPower = SlicesPerPower;
    type MaxPools = ConstU32<4>;
    type MaxGroupBuyers = ConstU32<3>;
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut t = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .unwrap();
    pallet_balances::GenesisConfig::<Test> {
        balances: vec![
            (ALICE, INITIAL_BALANCE),
            (BOB, INITIAL_BALANCE),
            (CAROL, INITIAL_BALANCE),
            (DAVE, INITIAL_BALANCE),
            (EVE, EVE_BALANCE),
        ],
        ..Default::default()
    }
    .assimilate_storage(&mut t)
    .unwrap();
    pallet_slice_pool::GenesisConfig::<Test>::default()
        .assimilate_storage(&mut t)
        .unwrap();

    let mut ext: sp_io::TestExternalities = t.into();
    ext.execute_with(|| System::set_block_number(1));
    ext
}

pub fn run_to_block(n: u64) {
    while System::block_number() < n {
        let next = System::block_number() + 1;
        System::set_block_number(next);
        Subsidy::on_initialize(next);
    }
}
