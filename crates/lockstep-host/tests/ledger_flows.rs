// crates/lockstep-host/tests/ledger_flows.rs
//
// End-to-end flows through the transactional host: vesting, staking, the
// claim-to-stake bridge, reward reclaim and recovery.

use lockstep_core::events::AssetKind;
use lockstep_core::types::SECONDS_PER_DAY;
use lockstep_core::{Address, Amount, LedgerEvent, LockstepError, Timestamp, UNIT};
use lockstep_host::{AssetSpec, Chain, ChainConfig, GenesisBalance, LedgerKind};
use lockstep_staking::PoolParams;

const T: Timestamp = 1_700_000_000;
const DAY: u64 = SECONDS_PER_DAY;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn owner() -> Address {
    addr("owner")
}

fn alice() -> Address {
    addr("alice")
}

fn bob() -> Address {
    addr("bob")
}

fn balance(account: &str, amount: Amount, asset: AssetSpec) -> GenesisBalance {
    GenesisBalance {
        account: account.to_string(),
        amount,
        asset,
    }
}

fn config() -> ChainConfig {
    ChainConfig {
        foreign_tokens: vec!["usdc".to_string()],
        balances: vec![
            balance("owner", 10_000 * UNIT, AssetSpec::Managed),
            balance("alice", 100 * UNIT, AssetSpec::Managed),
            balance("bob", 100 * UNIT, AssetSpec::Managed),
        ],
        ..ChainConfig::default()
    }
}

/// A chain where the owner has approved both ledgers and the bridge is bound.
fn chain() -> Chain {
    let mut chain = Chain::from_config(&config()).unwrap();
    let vesting = chain.vesting().address();
    let staking = chain.staking().address();
    chain.approve(owner(), vesting, Amount::MAX).unwrap();
    chain.approve(owner(), staking, Amount::MAX).unwrap();
    chain.approve(alice(), staking, Amount::MAX).unwrap();
    chain.approve(bob(), staking, Amount::MAX).unwrap();
    chain.set_stake_address(owner()).unwrap();
    chain
}

fn pool(start: Timestamp, end: Timestamp) -> PoolParams {
    PoolParams {
        min_stake: UNIT,
        max_stake: 2 * UNIT,
        start_time: start,
        end_time: end,
        reward_permill: 10,
        lock_period: 7 * DAY,
        max_total_staked: 10 * UNIT,
    }
}

fn tracked_total(chain: &Chain) -> Amount {
    [owner(), alice(), bob(), chain.vesting().address(), chain.staking().address()]
        .iter()
        .map(|a| chain.token_balance(a))
        .sum()
}

#[test]
fn test_three_grants_release_six_and_a_half_tokens() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 1, T + 10 * DAY, UNIT, 3 * UNIT)
        .unwrap();
    chain
        .create_vest(owner(), alice(), T + 10 * DAY, T + 30 * DAY, 0, 2 * UNIT)
        .unwrap();
    chain
        .create_vest(owner(), alice(), T + 30 * DAY, T + 130 * DAY, 0, 3 * UNIT / 2)
        .unwrap();
    assert_eq!(chain.vesting().vested(), 13 * UNIT / 2);

    // Halfway through the first grant: 1 + 2 * floor(431999e9 / 863999) / 1e9.
    chain.set_time(T + 5 * DAY);
    assert_eq!(chain.vesting().claimable(&alice(), chain.now()), 1_999_998_842_000_000_000);

    chain.set_time(T + 141 * DAY);
    let before = chain.token_balance(&alice());
    let paid = chain.claim(alice()).unwrap();
    assert_eq!(paid, 13 * UNIT / 2);
    assert_eq!(chain.token_balance(&alice()), before + paid);
    assert_eq!(chain.vesting().vested(), 0);
    assert_eq!(chain.vesting().balance_of(&alice()), 0);
    assert_eq!(chain.claim(alice()), Err(LockstepError::NothingToClaim));
    chain.check_invariants().unwrap();
}

#[test]
fn test_deposit_two_tokens_locks_two_point_zero_two() {
    let mut chain = chain();
    chain.add_stake_pool(owner(), pool(T + 10, T + DAY)).unwrap();
    chain.set_time(T + 10);

    let position = chain.deposit(alice(), 0, 2 * UNIT).unwrap();
    assert_eq!(position.total_amount, 2 * UNIT + 2 * UNIT / 100);
    assert_eq!(position.end_time, T + 10 + 7 * DAY);
    assert_eq!(chain.token_balance(&alice()), 98 * UNIT);

    chain.set_time(T + 10 + 7 * DAY + 1);
    assert_eq!(chain.withdraw(alice()).unwrap(), 2 * UNIT + 2 * UNIT / 100);
    assert_eq!(chain.token_balance(&alice()), 100 * UNIT + 2 * UNIT / 100);
    chain.check_invariants().unwrap();
}

#[test]
fn test_single_claim_pays_both_grants_at_once() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 1, T + 10 * DAY, UNIT, 3 * UNIT)
        .unwrap();
    chain
        .create_vest(owner(), alice(), T + 2, T + 20 * DAY, 0, 4 * UNIT)
        .unwrap();
    chain.set_time(T + 7 * DAY);

    let now = chain.now();
    let expected: Amount = chain
        .vesting()
        .get_vestings(&alice())
        .iter()
        .map(|p| lockstep_vesting::claimable_amount(p, now))
        .sum();
    chain.drain_events();

    let paid = chain.claim(alice()).unwrap();
    assert_eq!(paid, expected);

    let claimed: Vec<Amount> = chain
        .vesting()
        .get_vestings(&alice())
        .iter()
        .map(|p| p.claimed)
        .collect();
    assert!(claimed.iter().all(|c| *c > 0));
    assert_eq!(claimed.iter().sum::<Amount>(), paid);

    let claims: Vec<&LedgerEvent> = chain
        .events()
        .iter()
        .filter(|e| matches!(e, LedgerEvent::Claimed { .. }))
        .collect();
    assert_eq!(claims.len(), 1);
    chain.check_invariants().unwrap();
}

#[test]
fn test_claim_to_stake_with_nothing_unlocked_touches_nothing() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 100, T + 10 * DAY, UNIT, 3 * UNIT)
        .unwrap();
    chain.add_stake_pool(owner(), pool(T + 10, T + DAY)).unwrap();
    chain.set_time(T + 50);
    let events = chain.events().len();

    assert_eq!(chain.claim_to_stake(alice(), 0), Err(LockstepError::NothingToClaim));
    assert_eq!(chain.staking().stake_count(&alice()), 0);
    assert_eq!(chain.staking().pool(0).unwrap().total_staked, 0);
    assert_eq!(chain.events().len(), events);
}

#[test]
fn test_claim_to_stake_moves_unlocked_tokens_into_a_position() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 1, T + 2, 2 * UNIT, 3 * UNIT)
        .unwrap();
    chain
        .add_stake_pool(
            owner(),
            PoolParams {
                max_stake: 5 * UNIT,
                ..pool(T + 1, T + DAY)
            },
        )
        .unwrap();
    chain.set_time(T + 3);

    let vesting_before = chain.token_balance(&chain.vesting().address());
    let staked = chain.claim_to_stake(alice(), 0).unwrap();
    assert_eq!(staked, 3 * UNIT);
    assert_eq!(chain.token_balance(&chain.vesting().address()), vesting_before - 3 * UNIT);
    assert_eq!(chain.vesting().vested(), 0);
    assert_eq!(chain.vesting().get_vesting(&alice(), 0).unwrap().claimed, 3 * UNIT);
    // Nothing was paid to the beneficiary directly.
    assert_eq!(chain.token_balance(&alice()), 100 * UNIT);

    let position = chain.staking().stake(&alice(), 0).unwrap();
    assert_eq!(position.total_amount, 3 * UNIT + 3 * UNIT / 100);
    assert_eq!(chain.staking().staked_in_pool(&alice(), 0).unwrap(), 3 * UNIT);
    chain.check_invariants().unwrap();
}

#[test]
fn test_claim_to_stake_rolls_back_when_staking_refuses() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 1, T + 2, 2 * UNIT, 3 * UNIT)
        .unwrap();
    chain.add_stake_pool(owner(), pool(T + 10, T + 20)).unwrap();
    // The pool window has closed.
    chain.set_time(T + 30);

    let vesting_custody = chain.token_balance(&chain.vesting().address());
    let events = chain.events().len();
    let result = chain.claim_to_stake(alice(), 0);
    assert!(matches!(result, Err(LockstepError::StakeRefused(_))));

    assert_eq!(chain.vesting().get_vesting(&alice(), 0).unwrap().claimed, 0);
    assert_eq!(chain.vesting().vested(), 3 * UNIT);
    assert_eq!(chain.token_balance(&chain.vesting().address()), vesting_custody);
    assert_eq!(chain.staking().stake_count(&alice()), 0);
    assert_eq!(chain.events().len(), events);

    // The tokens can still be claimed normally.
    assert_eq!(chain.claim(alice()).unwrap(), 3 * UNIT);
    chain.check_invariants().unwrap();
}

#[test]
fn test_claim_to_stake_requires_the_bridge() {
    let mut chain = Chain::from_config(&config()).unwrap();
    let vesting = chain.vesting().address();
    chain.approve(owner(), vesting, Amount::MAX).unwrap();
    chain
        .create_vest(owner(), alice(), T + 1, T + 2, 2 * UNIT, 3 * UNIT)
        .unwrap();
    chain.set_time(T + 5);
    assert_eq!(chain.claim_to_stake(alice(), 0), Err(LockstepError::BridgeNotSet));

    chain.set_stake_address(owner()).unwrap();
    assert_eq!(
        chain.set_stake_address(owner()),
        Err(LockstepError::BridgeAlreadySet)
    );
}

#[test]
fn test_reclaim_skips_pools_still_open() {
    let mut chain = chain();
    chain.add_stake_pool(owner(), pool(T + 10, T + 100)).unwrap();
    chain.add_stake_pool(owner(), pool(T + 10, T + 10 * DAY)).unwrap();
    chain.set_time(T + 10);
    chain.deposit(alice(), 0, 2 * UNIT).unwrap();
    chain.deposit(bob(), 1, 2 * UNIT).unwrap();

    chain.set_time(T + 100);
    let owner_before = chain.token_balance(&owner());
    let reclaimed = chain.reclaim_rewards(owner()).unwrap();

    // Only pool 0 is closed: 1% of its unfilled 7.98 tokens.
    assert_eq!(reclaimed, 798 * UNIT / 10_000);
    assert_eq!(chain.token_balance(&owner()), owner_before + reclaimed);
    assert_eq!(chain.staking().pool_count(), 1);
    assert_eq!(chain.staking().pool(0).unwrap().params.end_time, T + 10 * DAY);
    chain.check_invariants().unwrap();

    // Nothing left to reclaim until the second pool closes.
    assert_eq!(
        chain.reclaim_rewards(owner()),
        Err(LockstepError::NothingToRecover)
    );
}

#[test]
fn test_no_double_pay_and_claim_for_pays_the_beneficiary() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 1, T + 10 * DAY, UNIT, 3 * UNIT)
        .unwrap();
    chain.set_time(T + 3 * DAY);

    let bob_before = chain.token_balance(&bob());
    let alice_before = chain.token_balance(&alice());
    let paid = chain.claim_for(bob(), alice()).unwrap();
    assert!(paid > UNIT);
    assert_eq!(chain.token_balance(&alice()), alice_before + paid);
    assert_eq!(chain.token_balance(&bob()), bob_before);

    // Same instant, nothing new has unlocked.
    assert_eq!(chain.claim(alice()), Err(LockstepError::NothingToClaim));
    assert_eq!(
        chain.claim_one_for(bob(), alice(), 0),
        Err(LockstepError::NothingToClaim)
    );
    assert_eq!(
        chain.claim_one_for(bob(), alice(), 1),
        Err(LockstepError::IndexOutOfRange { index: 1, len: 1 })
    );
    assert_eq!(chain.claim_for(bob(), bob()), Err(LockstepError::NoLocks));
}

#[test]
fn test_transfer_alias_claims_for_the_caller() {
    let mut chain = chain();
    chain
        .create_vest(owner(), alice(), T + 1, T + 2, UNIT, 3 * UNIT)
        .unwrap();
    chain.set_time(T + 3);

    let bob_before = chain.token_balance(&bob());
    let paid = chain.vesting_transfer(alice(), bob(), 50 * UNIT).unwrap();
    assert_eq!(paid, 3 * UNIT);
    assert_eq!(chain.token_balance(&alice()), 103 * UNIT);
    assert_eq!(chain.token_balance(&bob()), bob_before);
}

#[test]
fn test_mass_create_vest_is_all_or_nothing() {
    let mut chain = chain();
    let vesting = chain.vesting().address();
    let result = chain.mass_create_vest(
        owner(),
        &[alice(), vesting],
        &[T + 1, T + 1],
        &[T + 10, T + 10],
        &[0, 0],
        &[UNIT, UNIT],
    );
    // The second beneficiary is a contract.
    assert!(matches!(result, Err(LockstepError::InvalidArgument(_))));
    assert_eq!(chain.vesting().get_vesting_count(&alice()), 0);
    assert_eq!(chain.vesting().vested(), 0);

    chain
        .mass_create_vest(
            owner(),
            &[alice(), bob()],
            &[T + 1, T + 1],
            &[T + 10, T + 10],
            &[0, UNIT],
            &[UNIT, 2 * UNIT],
        )
        .unwrap();
    assert_eq!(chain.vesting().vested(), 3 * UNIT);
    assert_eq!(chain.token_balance(&vesting), 3 * UNIT);
}

#[test]
fn test_failed_operation_publishes_no_events() {
    let mut chain = Chain::from_config(&config()).unwrap();
    // No allowance for the vesting ledger yet.
    let result = chain.create_vest(owner(), alice(), T + 1, T + 10, 0, UNIT);
    assert!(matches!(result, Err(LockstepError::TokenTransfer(_))));
    assert!(chain.events().is_empty());
    assert_eq!(chain.vesting().get_vesting_count(&alice()), 0);
}

#[test]
fn test_pool_capacity_and_position_limit() {
    let mut chain = chain();
    chain
        .add_stake_pool(
            owner(),
            PoolParams {
                max_stake: 11 * UNIT,
                max_total_staked: 11 * UNIT,
                ..pool(T + 1, T + DAY)
            },
        )
        .unwrap();
    chain.set_time(T + 1);

    for _ in 0..10 {
        chain.deposit(alice(), 0, UNIT).unwrap();
    }
    // 10 * 1.01 = 10.1 staked: one more position would be the 11th.
    assert_eq!(
        chain.deposit(alice(), 0, UNIT),
        Err(LockstepError::PositionLimit { limit: 10 })
    );
    // 10.1 + 1.01 overfills the 11 token pool.
    assert!(matches!(
        chain.deposit(bob(), 0, UNIT),
        Err(LockstepError::CapacityExceeded(_))
    ));
    chain.check_invariants().unwrap();
}

#[test]
fn test_recovery_never_touches_obligations() {
    let mut cfg = config();
    cfg.balances.push(balance("vesting", 5 * UNIT, AssetSpec::Native));
    cfg.balances.push(balance(
        "staking",
        7 * UNIT,
        AssetSpec::Foreign("usdc".to_string()),
    ));
    let mut chain = Chain::from_config(&cfg).unwrap();
    let vesting = chain.vesting().address();
    chain.approve(owner(), vesting, Amount::MAX).unwrap();
    chain
        .create_vest(owner(), alice(), T + 1, T + 10, 0, 4 * UNIT)
        .unwrap();

    // Nothing stray yet.
    assert_eq!(
        chain.recover(owner(), LedgerKind::Vesting, AssetKind::Managed, 0),
        Err(LockstepError::NothingToRecover)
    );

    chain
        .transfer_tokens(bob(), vesting, &AssetSpec::Managed, 2 * UNIT)
        .unwrap();
    assert!(matches!(
        chain.recover(alice(), LedgerKind::Vesting, AssetKind::Managed, 0),
        Err(LockstepError::Unauthorized(_))
    ));
    let swept = chain
        .recover(owner(), LedgerKind::Vesting, AssetKind::Managed, 0)
        .unwrap();
    assert_eq!(swept, 2 * UNIT);
    assert_eq!(chain.token_balance(&vesting), 4 * UNIT);

    let native = chain
        .recover(owner(), LedgerKind::Vesting, AssetKind::Native, UNIT)
        .unwrap();
    assert_eq!(native, UNIT);
    assert_eq!(chain.balance(&AssetSpec::Native, &owner()).unwrap(), UNIT);

    let usdc = AssetSpec::Foreign("usdc".to_string());
    let foreign = chain
        .recover(
            owner(),
            LedgerKind::Staking,
            AssetKind::Foreign(addr("usdc")),
            0,
        )
        .unwrap();
    assert_eq!(foreign, 7 * UNIT);
    assert_eq!(chain.balance(&usdc, &owner()).unwrap(), 7 * UNIT);
    assert_eq!(
        chain.recover(owner(), LedgerKind::Staking, AssetKind::Foreign(addr("dai")), 0),
        Err(LockstepError::InvalidArgument(format!(
            "no token ledger at {}",
            addr("dai").short()
        )))
    );
    chain.check_invariants().unwrap();
}

#[test]
fn test_ownership_transfer_moves_admin_rights() {
    let mut chain = chain();
    chain
        .transfer_ownership(owner(), LedgerKind::Staking, alice())
        .unwrap();
    assert_eq!(chain.staking().owner(), alice());
    assert_eq!(chain.vesting().owner(), owner());
    assert!(matches!(
        chain.add_stake_pool(owner(), pool(T + 10, T + 20)),
        Err(LockstepError::Unauthorized(_))
    ));
    chain
        .add_stake_pool(alice(), pool(T + 10, T + 20))
        .unwrap();
}

#[test]
fn test_mixed_sequence_conserves_tokens() {
    let mut chain = chain();
    let supply = chain.token_supply();

    chain
        .create_vest(owner(), alice(), T + 1, T + 20 * DAY, UNIT, 4 * UNIT)
        .unwrap();
    chain
        .create_vest(owner(), bob(), T + 1, T + 2, 2 * UNIT, 3 * UNIT)
        .unwrap();
    chain.add_stake_pool(owner(), pool(T + 1, T + 30 * DAY)).unwrap();
    chain.check_invariants().unwrap();

    chain.set_time(T + 3);
    chain.claim_to_stake(bob(), 0).unwrap_err();
    chain.deposit(bob(), 0, 2 * UNIT).unwrap();
    chain.check_invariants().unwrap();

    chain.advance_time(5 * DAY);
    chain.claim(alice()).unwrap();
    chain.claim_to_stake(alice(), 0).unwrap_err();
    chain.check_invariants().unwrap();

    chain.advance_time(3 * DAY);
    chain.withdraw(bob()).unwrap();
    chain.claim(bob()).unwrap();
    chain.check_invariants().unwrap();

    chain.advance_time(30 * DAY);
    chain.claim(alice()).unwrap();
    chain.reclaim_rewards(owner()).unwrap();
    chain.check_invariants().unwrap();

    assert_eq!(chain.token_supply(), supply);
    assert_eq!(tracked_total(&chain), supply);
    assert_eq!(chain.vesting().vested(), 0);
    assert_eq!(chain.staking().staked_and_rewards(), 0);
}
