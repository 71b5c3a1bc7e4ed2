//! Walkthrough of the Comrade ledger.
//!
//! Deploys a ledger, moves tokens with and without fees, delegates spending
//! through an allowance, and shows the owner retuning the fee rate. The
//! output uses ANSI escape codes for colored terminal rendering.
//!
//! Run with:
//!   cargo run -p comrade-protocol --example demo

use std::time::Instant;

use comrade_protocol::{Address, GenesisConfig, Ledger, LedgerEvent};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";
const RED: &str = "\x1b[31m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                            {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    COMRADE LEDGER  --  Transfer Fee Walkthrough            {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                            {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]================================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!("{CYAN}------------------------------------------------------------{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn rejected(text: &str) {
    println!("{RED}  [REJECTED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn balance_row(name: &str, balance: u64, color: &str) {
    println!("  {color}{BOLD}{name:<10}{RESET}  {WHITE}{balance:>12}{RESET}");
}

fn balances(ledger: &Ledger, people: &[(&str, Address, &str)]) {
    for (name, addr, color) in people {
        balance_row(name, ledger.balance_of(addr), color);
    }
}

fn print_events(ledger: &mut Ledger) {
    for event in ledger.drain_events() {
        let line = match event {
            LedgerEvent::Transfer { amount, .. } => format!("Transfer {amount}"),
            LedgerEvent::FeeCollected { fee, .. } => format!("FeeCollected {fee}"),
            LedgerEvent::Approval { amount, .. } => format!("Approval {amount}"),
            other => format!("{other:?}"),
        };
        println!("{DIM}{MAGENTA}    event: {line}{RESET}");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let start = Instant::now();
    banner();

    let deployer = Address::from_label("deployer");
    let protocol = Address::from_label("protocol");
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");
    let shop = Address::from_label("shop");
    let people = [
        ("deployer", deployer, CYAN),
        ("protocol", protocol, MAGENTA),
        ("alice", alice, BLUE),
        ("bob", bob, GREEN),
        ("shop", shop, YELLOW),
    ];

    // Step 1
    section(1, "Deploy at 10%");
    let genesis = GenesisConfig::new(deployer, protocol).with_fee_rate(1_000);
    let mut ledger = Ledger::new(genesis).expect("valid genesis");
    print_events(&mut ledger);
    info("Total supply", &ledger.total_supply().to_string());
    info("Fee rate", &format!("{} bps", ledger.protocol_perc()));

    // Step 2
    section(2, "Taxed transfers");
    let receipt = ledger.transfer(deployer, alice, 500).expect("deployer funds alice");
    success(&format!("deployer -> alice 500, fee {}", receipt.fee));
    print_events(&mut ledger);

    match ledger.transfer(alice, bob, 500) {
        Ok(_) => unreachable!("alice cannot cover the fee"),
        Err(e) => rejected(&e.to_string()),
    }
    let receipt = ledger.transfer(alice, bob, 454).expect("fits principal plus fee");
    success(&format!("alice -> bob 454, fee {}", receipt.fee));
    print_events(&mut ledger);
    balances(&ledger, &people);

    // Step 3
    section(3, "Delegated spending");
    ledger.add_exempt(deployer, shop).expect("owner exempts shop");
    ledger.approve(bob, shop, 300).expect("bob approves shop");
    info("bob holding", &ledger.allowance_holding(&bob).to_string());
    let receipt = ledger
        .transfer_from(shop, bob, shop, 200)
        .expect("shop pulls from bob");
    success(&format!("shop pulled 200 from bob, bob paid fee {}", receipt.fee));
    info("remaining allowance", &ledger.allowance(&bob, &shop).to_string());
    info("bob holding", &ledger.allowance_holding(&bob).to_string());
    print_events(&mut ledger);

    // Step 4
    section(4, "Owner retunes the fee");
    match ledger.set_protocol_perc(alice, 0) {
        Ok(_) => unreachable!("alice is not the owner"),
        Err(e) => rejected(&e.to_string()),
    }
    ledger.set_protocol_perc(deployer, 250).expect("owner sets 2.5%");
    success("fee rate now 250 bps");
    info("bob holding (repriced)", &ledger.allowance_holding(&bob).to_string());
    print_events(&mut ledger);

    // Summary
    section(5, "Final state");
    balances(&ledger, &people);
    info("Fees paid by alice", &ledger.total_fees_paid(&alice).to_string());
    info("Tokens sent by bob", &ledger.total_tokens_sent(&bob).to_string());
    ledger.check_invariants().expect("ledger is consistent");
    success("supply conserved, holdings consistent");
    info("State digest", &ledger.state_digest()[..16]);
    info(
        "Elapsed",
        &format!("{:.2} ms", start.elapsed().as_secs_f64() * 1000.0),
    );
    println!();
}
