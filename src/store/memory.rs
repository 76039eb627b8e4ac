use std::collections::BTreeMap;

use crate::errors::{LedgerError, Result};
use crate::records::{DueRecord, DueSchedule, PenaltyRecord, Policy};
use crate::store::LedgerStore;
use crate::types::{DueRecordId, PenaltyId, PolicyId};

/// in-memory reference adapter
///
/// Backs the tests and demos. Transactions are snapshot-and-restore: the
/// whole data set is cloned before the closure runs and restored when it
/// errors, so a failed operation leaves no partial writes. BTreeMaps keep
/// iteration order deterministic.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: LedgerData,
}

#[derive(Debug, Default, Clone)]
struct LedgerData {
    policies: BTreeMap<PolicyId, Policy>,
    due_records: BTreeMap<DueRecordId, DueRecord>,
    penalties: BTreeMap<PenaltyId, PenaltyRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_count(&self) -> usize {
        self.data.policies.len()
    }

    pub fn due_record_count(&self) -> usize {
        self.data.due_records.len()
    }

    pub fn penalty_count(&self) -> usize {
        self.data.penalties.len()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_policy(&mut self, policy: Policy) -> Result<()> {
        self.data.policies.insert(policy.id, policy);
        Ok(())
    }

    fn policy(&self, id: PolicyId) -> Result<Policy> {
        self.data
            .policies
            .get(&id)
            .cloned()
            .ok_or(LedgerError::PolicyNotFound { id })
    }

    fn update_policy(&mut self, policy: &Policy) -> Result<()> {
        match self.data.policies.get_mut(&policy.id) {
            Some(slot) => {
                *slot = policy.clone();
                Ok(())
            }
            None => Err(LedgerError::PolicyNotFound { id: policy.id }),
        }
    }

    fn active_policies(&self) -> Result<Vec<Policy>> {
        Ok(self
            .data
            .policies
            .values()
            .filter(|p| p.is_active && !p.archived && !p.status.is_terminal())
            .cloned()
            .collect())
    }

    fn insert_due_records(&mut self, records: &[DueRecord]) -> Result<()> {
        for record in records {
            self.data.due_records.insert(record.id, record.clone());
        }
        Ok(())
    }

    fn due_record(&self, id: DueRecordId) -> Result<DueRecord> {
        self.data
            .due_records
            .get(&id)
            .cloned()
            .ok_or(LedgerError::DueRecordNotFound { id })
    }

    fn due_records(&self, policy_id: PolicyId) -> Result<DueSchedule> {
        let records: Vec<DueRecord> = self
            .data
            .due_records
            .values()
            .filter(|r| r.policy_id == policy_id)
            .cloned()
            .collect();
        Ok(DueSchedule::new(records))
    }

    fn update_due_record(&mut self, record: &DueRecord) -> Result<()> {
        match self.data.due_records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(LedgerError::DueRecordNotFound { id: record.id }),
        }
    }

    fn delete_due_record(&mut self, id: DueRecordId) -> Result<()> {
        self.data
            .due_records
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::DueRecordNotFound { id })
    }

    fn insert_penalty(&mut self, penalty: &PenaltyRecord) -> Result<()> {
        let duplicate = self.data.penalties.values().any(|p| {
            p.due_record_id == penalty.due_record_id && p.penalty_date == penalty.penalty_date
        });
        if duplicate {
            return Err(LedgerError::DuplicatePenalty {
                due_record_id: penalty.due_record_id,
                date: penalty.penalty_date,
            });
        }
        self.data.penalties.insert(penalty.id, penalty.clone());
        Ok(())
    }

    fn penalties(&self, due_record_id: DueRecordId) -> Result<Vec<PenaltyRecord>> {
        let mut penalties: Vec<PenaltyRecord> = self
            .data
            .penalties
            .values()
            .filter(|p| p.due_record_id == due_record_id)
            .cloned()
            .collect();
        penalties.sort_by(|a, b| a.penalty_date.cmp(&b.penalty_date));
        Ok(penalties)
    }

    fn update_penalty(&mut self, penalty: &PenaltyRecord) -> Result<()> {
        match self.data.penalties.get_mut(&penalty.id) {
            Some(slot) => {
                *slot = penalty.clone();
                Ok(())
            }
            None => Err(LedgerError::PenaltyNotFound { id: penalty.id }),
        }
    }

    fn delete_penalty(&mut self, id: PenaltyId) -> Result<()> {
        self.data
            .penalties
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::PenaltyNotFound { id })
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.data.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.data = snapshot;
                Err(err)
            }
        }
    }
}
