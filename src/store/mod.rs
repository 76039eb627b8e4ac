pub mod memory;

pub use memory::MemoryStore;

use crate::errors::Result;
use crate::records::{DueRecord, DueSchedule, PenaltyRecord, Policy};
use crate::types::{DueRecordId, PenaltyId, PolicyId};

/// keyed-record store the ledger engines read and write through
///
/// The engines never talk to a database directly; they consume this
/// interface and assume the adapter provides filtered reads, ordered range
/// reads, and an atomic multi-step `transaction`. Any adapter failure is
/// fatal to the current operation — the engines do not retry.
pub trait LedgerStore {
    // policies
    fn insert_policy(&mut self, policy: Policy) -> Result<()>;
    fn policy(&self, id: PolicyId) -> Result<Policy>;
    fn update_policy(&mut self, policy: &Policy) -> Result<()>;
    /// active, non-archived policies with no terminal status
    fn active_policies(&self) -> Result<Vec<Policy>>;

    // due records
    fn insert_due_records(&mut self, records: &[DueRecord]) -> Result<()>;
    fn due_record(&self, id: DueRecordId) -> Result<DueRecord>;
    /// all due records of a policy, in due-date order
    fn due_records(&self, policy_id: PolicyId) -> Result<DueSchedule>;
    fn update_due_record(&mut self, record: &DueRecord) -> Result<()>;
    fn delete_due_record(&mut self, id: DueRecordId) -> Result<()>;

    // penalties
    /// rejects a second penalty for the same due record and calendar day
    fn insert_penalty(&mut self, penalty: &PenaltyRecord) -> Result<()>;
    /// penalties of a due record, in penalty-date order
    fn penalties(&self, due_record_id: DueRecordId) -> Result<Vec<PenaltyRecord>>;
    fn update_penalty(&mut self, penalty: &PenaltyRecord) -> Result<()>;
    fn delete_penalty(&mut self, id: PenaltyId) -> Result<()>;

    /// run `f` atomically: either every write inside it lands, or none do
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}
