/// quick start - minimal example to get started
use policy_ledger_rs::{
    EventStore, LedgerStore, LifecycleEngine, MemoryStore, Money, PaymentChannel,
    PaymentEngine, Policy, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = MemoryStore::new();
    let mut events = EventStore::new();
    let time = SafeTimeProvider::new(TimeSource::System);

    // a 12,000.00 annual premium paid in 12 monthly installments
    let policy = Policy::new("POL-2024-001", "HOLDER-42", Money::from_major(12_000), 12);
    let policy_id = policy.id;
    store.insert_policy(policy)?;

    // activate: sets inception/expiry and generates the schedule
    let lifecycle = LifecycleEngine::new();
    let schedule = lifecycle.activate(&mut store, policy_id, &time, &mut events)?;
    println!("generated {} installments, first due {}", schedule.len(), schedule.first().unwrap().due_date);

    // pay the first installment
    let first_due = schedule.first().unwrap().id;
    let receipt = PaymentEngine::new().apply_payment(
        &mut store,
        first_due,
        Money::from_major(1_000),
        PaymentChannel::BankTransfer,
        Some("TXN-0001".to_string()),
        &time,
        &mut events,
    )?;
    println!("payment allocated: {}", receipt.total_allocated());

    for event in events.take_events() {
        println!("event: {:?}", event);
    }

    Ok(())
}
