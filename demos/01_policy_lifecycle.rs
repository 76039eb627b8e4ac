/// policy lifecycle - activation, cancellation with refund, expiry
use chrono::{Duration, TimeZone, Utc};
use policy_ledger_rs::{
    EventStore, LedgerStore, LifecycleEngine, MemoryStore, Money, Policy, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== policy lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut store = MemoryStore::new();
    let mut events = EventStore::new();
    let lifecycle = LifecycleEngine::new();

    // activate one policy
    let policy = Policy::new("POL-A", "HOLDER-1", Money::from_major(6_000), 6);
    let policy_id = policy.id;
    store.insert_policy(policy)?;
    lifecycle.activate(&mut store, policy_id, &time, &mut events)?;
    let active = store.policy(policy_id)?;
    println!(
        "activated on {}, expires {}",
        active.inception_date.unwrap(),
        active.expiry_date.unwrap()
    );

    // cancel a second policy that never had a schedule: the engine
    // generates one so the first period can be refunded
    let other = Policy::new("POL-B", "HOLDER-2", Money::from_major(2_400), 4);
    let other_id = other.id;
    store.insert_policy(other)?;
    let cancellation = lifecycle.cancel(&mut store, other_id, "customer withdrew", &time, &mut events)?;
    println!(
        "\ncancelled POL-B: refunded {} on the first period, {} later periods cancelled",
        cancellation.refund_amount, cancellation.cancelled_installments
    );

    // advance past expiry and observe deactivation
    controller.advance(Duration::days(400));
    println!("\nadvanced to: {}", time.now().format("%Y-%m-%d"));
    let deactivated = lifecycle.deactivate_if_expired(&mut store, policy_id, &time, &mut events)?;
    println!("POL-A expired, deactivation persisted: {}", deactivated);

    println!("\nevents:");
    for event in events.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
