//! End-to-end tests for the Comrade ledger.
//!
//! These walk through the documented behaviours across module boundaries:
//! genesis, taxed transfers, the two-stage balance check, exemptions,
//! delegated spending with holding bookkeeping, and admin changes in the
//! middle of outstanding allowances.
//!
//! Each test builds its own ledger. No shared state.

use comrade_protocol::{
    Address, GenesisConfig, Ledger, LedgerError, LedgerEvent, TransferReceipt,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn owner() -> Address {
    addr("deployer")
}

fn wallet() -> Address {
    addr("protocol")
}

/// Fresh ledger at `bps` with the default 1_000_000 supply.
fn setup(bps: u32) -> Ledger {
    let genesis = GenesisConfig::new(owner(), wallet()).with_fee_rate(bps);
    let mut ledger = Ledger::new(genesis).expect("valid genesis");
    ledger.drain_events();
    ledger
}

/// Moves `amount` from the owner to `to` without a fee, then restores `bps`.
fn seed(ledger: &mut Ledger, to: Address, amount: u64) {
    let bps = ledger.protocol_perc();
    ledger.set_protocol_perc(owner(), 0).unwrap();
    ledger.transfer(owner(), to, amount).unwrap();
    ledger.set_protocol_perc(owner(), bps).unwrap();
    ledger.drain_events();
}

fn sum_of_balances(ledger: &Ledger, accounts: &[Address]) -> u64 {
    accounts.iter().map(|a| ledger.balance_of(a)).sum()
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

#[test]
fn total_supply_assigned_to_owner() {
    let ledger = setup(100);
    assert_eq!(ledger.total_supply(), ledger.balance_of(&owner()));
    assert_eq!(ledger.owner(), owner());
    assert_eq!(ledger.protocol_wallet(), wallet());
    assert_eq!(ledger.protocol_perc(), 100);
}

#[test]
fn transfers_between_accounts_at_zero_rate() {
    let mut ledger = setup(0);
    ledger.transfer(owner(), addr("addr1"), 50).unwrap();
    assert_eq!(ledger.balance_of(&addr("addr1")), 50);

    ledger.transfer(addr("addr1"), addr("addr2"), 50).unwrap();
    assert_eq!(ledger.balance_of(&addr("addr2")), 50);
    assert_eq!(ledger.balance_of(&addr("addr1")), 0);
}

#[test]
fn empty_sender_cannot_transfer() {
    let mut ledger = setup(100);
    let before = ledger.balance_of(&owner());
    assert_eq!(
        ledger.transfer(addr("addr1"), owner(), 1),
        Err(LedgerError::InsufficientBalance { balance: 0, amount: 1 })
    );
    assert_eq!(ledger.balance_of(&owner()), before);
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

#[test]
fn ten_percent_fee_on_small_transfer() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 100);
    let wallet_before = ledger.balance_of(&wallet());

    let receipt = ledger.transfer(addr("alice"), addr("bob"), 10).unwrap();

    assert_eq!(receipt, TransferReceipt { amount: 10, fee: 1 });
    assert_eq!(ledger.balance_of(&addr("bob")), 10);
    assert_eq!(ledger.balance_of(&addr("alice")), 89);
    assert_eq!(ledger.balance_of(&wallet()), wallet_before + 1);
}

#[test]
fn two_stage_balance_check() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 450);

    assert!(matches!(
        ledger.transfer(addr("alice"), addr("x"), 500),
        Err(LedgerError::InsufficientBalance { .. })
    ));
    assert!(matches!(
        ledger.transfer(addr("alice"), addr("x"), 450),
        Err(LedgerError::CannotPayFee { fee: 45, .. })
    ));
    assert_eq!(ledger.total_tokens_sent(&addr("alice")), 0);
    assert_eq!(ledger.total_fees_paid(&addr("alice")), 0);

    // The largest principal that still fits: 409 + 40 = 449.
    ledger.transfer(addr("alice"), addr("x"), 409).unwrap();
    assert_eq!(ledger.balance_of(&addr("alice")), 1);
}

#[test]
fn exempt_sender_moves_entire_balance() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 777);
    ledger.add_exempt(owner(), addr("alice")).unwrap();

    ledger.transfer(addr("alice"), addr("bob"), 777).unwrap();

    assert_eq!(ledger.balance_of(&addr("alice")), 0);
    assert_eq!(ledger.total_fees_paid(&addr("alice")), 0);
    assert_eq!(ledger.total_tokens_sent(&addr("alice")), 777);
}

#[test]
fn exemption_only_covers_the_payer() {
    let mut ledger = setup(1_000);
    ledger.add_exempt(owner(), addr("bob")).unwrap();
    seed(&mut ledger, addr("alice"), 110);

    // Recipient exemption does not waive the sender's fee.
    ledger.transfer(addr("alice"), addr("bob"), 100).unwrap();
    assert_eq!(ledger.total_fees_paid(&addr("alice")), 10);
}

// ---------------------------------------------------------------------------
// Delegated Spending
// ---------------------------------------------------------------------------

#[test]
fn delegated_spend_full_cycle() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 100);
    let wallet_before = ledger.balance_of(&wallet());

    ledger.approve(addr("alice"), addr("spender"), 50).unwrap();
    assert_eq!(ledger.allowance_holding(&addr("alice")), 5);
    assert_eq!(ledger.balance_of(&addr("alice")), 100);

    ledger
        .transfer_from(addr("spender"), addr("alice"), addr("carol"), 50)
        .unwrap();

    assert_eq!(ledger.balance_of(&addr("alice")), 45);
    assert_eq!(ledger.balance_of(&addr("carol")), 50);
    assert_eq!(ledger.allowance_holding(&addr("alice")), 0);
    assert_eq!(ledger.balance_of(&wallet()), wallet_before + 5);

    let events = ledger.drain_events();
    assert!(events.contains(&LedgerEvent::Approval {
        owner: addr("alice"),
        spender: addr("spender"),
        amount: 0,
    }));
}

#[test]
fn repeated_partial_spends_track_remaining_allowance() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 1_000);
    ledger.approve(addr("alice"), addr("s"), 300).unwrap();

    for _ in 0..3 {
        ledger
            .transfer_from(addr("s"), addr("alice"), addr("bob"), 100)
            .unwrap();
        let left = ledger.allowance(&addr("alice"), &addr("s"));
        assert_eq!(ledger.allowance_holding(&addr("alice")), left / 10);
    }
    assert_eq!(ledger.allowance(&addr("alice"), &addr("s")), 0);
    assert_eq!(ledger.balance_of(&addr("alice")), 1_000 - 330);
    assert!(matches!(
        ledger.transfer_from(addr("s"), addr("alice"), addr("bob"), 1),
        Err(LedgerError::InsufficientAllowance { allowance: 0, requested: 1 })
    ));
}

#[test]
fn holding_is_informational_not_a_lock() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 100);
    ledger.approve(addr("alice"), addr("s"), 100).unwrap();
    assert_eq!(ledger.allowance_holding(&addr("alice")), 10);

    // The owner can still spend its whole balance directly.
    ledger.transfer(addr("alice"), addr("bob"), 90).unwrap();
    assert_eq!(ledger.balance_of(&addr("alice")), 1);

    // The spender's call then fails on balance, not allowance.
    assert!(matches!(
        ledger.transfer_from(addr("s"), addr("alice"), addr("bob"), 100),
        Err(LedgerError::InsufficientBalance { .. })
    ));
}

#[test]
fn multiple_spenders_aggregate_holding() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 1_000);
    ledger.approve(addr("alice"), addr("s1"), 200).unwrap();
    ledger.approve(addr("alice"), addr("s2"), 300).unwrap();
    assert_eq!(ledger.allowance_holding(&addr("alice")), 50);

    ledger
        .transfer_from(addr("s1"), addr("alice"), addr("bob"), 200)
        .unwrap();
    assert_eq!(ledger.allowance_holding(&addr("alice")), 30);

    ledger.approve(addr("alice"), addr("s2"), 0).unwrap();
    assert_eq!(ledger.allowance_holding(&addr("alice")), 0);
}

#[test]
fn exempting_owner_mid_allowance_clears_holding() {
    let mut ledger = setup(1_000);
    seed(&mut ledger, addr("alice"), 100);
    ledger.approve(addr("alice"), addr("s"), 100).unwrap();
    ledger.add_exempt(owner(), addr("alice")).unwrap();
    assert_eq!(ledger.allowance_holding(&addr("alice")), 0);

    // Exempt now: spending the full allowance costs no fee.
    ledger
        .transfer_from(addr("s"), addr("alice"), addr("bob"), 100)
        .unwrap();
    assert_eq!(ledger.balance_of(&addr("alice")), 0);
    assert_eq!(ledger.total_fees_paid(&addr("alice")), 0);
}

// ---------------------------------------------------------------------------
// Conservation
// ---------------------------------------------------------------------------

#[test]
fn supply_conserved_through_mixed_activity() {
    let mut ledger = setup(250);
    let people = [owner(), wallet(), addr("a"), addr("b"), addr("c")];

    ledger.transfer(owner(), addr("a"), 10_000).unwrap();
    ledger.transfer(addr("a"), addr("b"), 4_000).unwrap();
    ledger.approve(addr("b"), addr("c"), 2_000).unwrap();
    ledger
        .transfer_from(addr("c"), addr("b"), addr("c"), 1_500)
        .unwrap();
    ledger.add_exempt(owner(), addr("c")).unwrap();
    ledger.transfer(addr("c"), wallet(), 1_500).unwrap();
    ledger.set_protocol_perc(owner(), 10_000).unwrap();
    let _ = ledger.transfer(addr("a"), addr("b"), 6_000);

    assert_eq!(sum_of_balances(&ledger, &people), ledger.total_supply());
    ledger.check_invariants().unwrap();
}
