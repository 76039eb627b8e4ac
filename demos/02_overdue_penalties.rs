/// overdue penalties - daily assessment, spillover payment, automatic void
use chrono::{Duration, TimeZone, Utc};
use policy_ledger_rs::{
    EventStore, LedgerStore, LifecycleEngine, MemoryStore, Money, PaymentChannel,
    PaymentEngine, PenaltyAssessor, Policy, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== overdue penalties example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut store = MemoryStore::new();
    let mut events = EventStore::new();
    let lifecycle = LifecycleEngine::new();
    let assessor = PenaltyAssessor::new();

    let policy = Policy::new("POL-OD", "HOLDER-7", Money::from_major(3_000), 3);
    let policy_id = policy.id;
    store.insert_policy(policy)?;
    let schedule = lifecycle.activate(&mut store, policy_id, &time, &mut events)?;
    let first_due = schedule.first().unwrap().id;

    // 10 days past the first due date: 10% penalty
    controller.advance(Duration::days(41));
    println!("today: {}", time.now().format("%Y-%m-%d"));
    let batch = assessor.assess_all(&mut store, &lifecycle, &time, &mut events)?;
    println!("penalties written: {}", batch.penalties_written);
    for penalty in store.penalties(first_due)? {
        println!("  {} ({})", penalty.amount, penalty.reason);
    }

    // 1300.00 clears the penalty, the first base, and spills 200.00 forward
    let receipt = PaymentEngine::new().apply_payment(
        &mut store,
        first_due,
        Money::from_major(1_300),
        PaymentChannel::Cash,
        None,
        &time,
        &mut events,
    )?;
    println!("\npayment of 1300.00 split across {} records:", receipt.allocations.len());
    for allocation in &receipt.allocations {
        println!(
            "  installment {}: penalties {}, principal {}",
            allocation.installment_no, allocation.to_penalties, allocation.to_principal
        );
    }

    // let the second installment run 90+ days overdue: automatic void
    controller.advance(Duration::days(150));
    println!("\ntoday: {}", time.now().format("%Y-%m-%d"));
    let batch = assessor.assess_all(&mut store, &lifecycle, &time, &mut events)?;
    println!("policies voided: {:?}", batch.policies_voided);
    let voided = store.policy(policy_id)?;
    println!("void reason: {:?}", voided.void_reason);

    Ok(())
}
