/// json state - serialize the ledger view for storage or transport
use chrono::{TimeZone, Utc};
use policy_ledger_rs::{
    queries, EventStore, LedgerStore, LifecycleEngine, MemoryStore, Money, PaymentChannel,
    PaymentEngine, Policy, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));

    let mut store = MemoryStore::new();
    let mut events = EventStore::new();
    let lifecycle = LifecycleEngine::new();

    let policy = Policy::new("POL-JSON", "HOLDER-9", Money::from_major(2_400), 4);
    let policy_id = policy.id;
    store.insert_policy(policy)?;
    let schedule = lifecycle.activate(&mut store, policy_id, &time, &mut events)?;

    PaymentEngine::new().apply_payment(
        &mut store,
        schedule.first().unwrap().id,
        Money::from_major(600),
        PaymentChannel::Card,
        Some("TXN-99".to_string()),
        &time,
        &mut events,
    )?;

    // the whole domain model serializes with serde
    let loaded = store.policy(policy_id)?;
    println!("policy:\n{}\n", serde_json::to_string_pretty(&loaded)?);

    let ledger = store.due_records(policy_id)?;
    println!("schedule:\n{}\n", serde_json::to_string_pretty(ledger.records())?);

    let summary = queries::account_summary(&store, policy_id, time.now().date_naive())?;
    println!("summary:\n{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
