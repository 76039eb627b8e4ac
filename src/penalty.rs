use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::lifecycle::LifecycleEngine;
use crate::records::{DueRecord, PenaltyRecord};
use crate::store::LedgerStore;
use crate::types::{DueRecordId, PolicyId};

/// penalty configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// percentage points accrued per overdue day
    pub daily_rate_percent: u32,
    /// cap on the accrued percentage
    pub cap_percent: u32,
    /// overdue days after which the policy is flagged for voiding
    pub void_threshold_days: u32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            daily_rate_percent: 1,
            cap_percent: 31,
            void_threshold_days: 90,
        }
    }
}

/// pure computation of an overdue surcharge for one due record
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyPreview {
    pub overdue_days: u32,
    pub rate: Rate,
    pub amount: Money,
    pub exempt: bool,
    pub settled: bool,
    pub should_void_policy: bool,
}

/// what happened when a due record was assessed
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    /// a penalty was written; prior unpaid penalties were superseded
    Assessed {
        penalty: PenaltyRecord,
        superseded: u32,
    },
    /// a penalty dated today already exists; no-op
    AlreadyAssessed,
    NotOverdue,
    /// installment kind is exempt from penalties
    Exempt,
    /// record fully paid, nothing to surcharge
    Settled,
}

/// result of assessing one due record
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub due_record_id: DueRecordId,
    pub policy_id: PolicyId,
    pub overdue_days: u32,
    pub rate: Rate,
    pub outcome: AssessmentOutcome,
    /// set whenever the record is past the void threshold and not fully
    /// paid, independent of whether a penalty was written today
    pub should_void_policy: bool,
}

/// result of a batch assessment pass
#[derive(Debug, Clone)]
pub struct BatchAssessment {
    pub assessments: Vec<Assessment>,
    pub penalties_written: u32,
    /// policies flagged for voiding, deduplicated
    pub policies_flagged: Vec<PolicyId>,
    /// subset of flagged policies actually voided in the follow-up pass
    pub policies_voided: Vec<PolicyId>,
}

/// computes overdue penalties and drives the daily assessment pass
pub struct PenaltyAssessor {
    config: PenaltyConfig,
}

impl Default for PenaltyAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PenaltyAssessor {
    pub fn new() -> Self {
        Self {
            config: PenaltyConfig::default(),
        }
    }

    pub fn with_config(config: PenaltyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    /// pure penalty computation for one record as of the given day
    pub fn preview(&self, due: &DueRecord, today: NaiveDate) -> PenaltyPreview {
        let overdue_days = due.overdue_days(today);
        let settled = due.is_fully_paid();
        let exempt = due.kind.is_penalty_exempt();

        let percent = (overdue_days * self.config.daily_rate_percent).min(self.config.cap_percent);
        let rate = Rate::from_percentage(percent);

        let amount = if overdue_days == 0 || settled || exempt {
            Money::ZERO
        } else {
            due.base_amount.percentage(Decimal::from(percent))
        };

        PenaltyPreview {
            overdue_days,
            rate,
            amount,
            exempt,
            settled,
            should_void_policy: overdue_days >= self.config.void_threshold_days && !settled,
        }
    }

    /// assess one due record as of today
    ///
    /// Idempotent per calendar day: a penalty dated today makes this a
    /// no-op. A fresh assessment supersedes prior unpaid penalties with a
    /// single cumulative record; paid penalties stay untouched.
    pub fn assess<S: LedgerStore>(
        &self,
        store: &mut S,
        due_record_id: DueRecordId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Assessment> {
        let today = time.now().date_naive();

        let assessment = store.transaction(|s| {
            let due = s.due_record(due_record_id)?;
            let policy = s.policy(due.policy_id)?;
            if policy.status.is_terminal() {
                return Err(LedgerError::InvalidStateTransition {
                    current: policy.state_label(today).to_string(),
                    attempted: "assess a penalty against".to_string(),
                });
            }

            let preview = self.preview(&due, today);
            let base = Assessment {
                due_record_id,
                policy_id: due.policy_id,
                overdue_days: preview.overdue_days,
                rate: preview.rate,
                outcome: AssessmentOutcome::NotOverdue,
                should_void_policy: preview.should_void_policy,
            };

            if preview.settled {
                return Ok(Assessment {
                    outcome: AssessmentOutcome::Settled,
                    ..base
                });
            }
            if preview.overdue_days == 0 {
                return Ok(base);
            }
            if preview.exempt {
                return Ok(Assessment {
                    outcome: AssessmentOutcome::Exempt,
                    ..base
                });
            }

            let existing = s.penalties(due_record_id)?;
            if existing.iter().any(|p| p.penalty_date == today) {
                return Ok(Assessment {
                    outcome: AssessmentOutcome::AlreadyAssessed,
                    ..base
                });
            }

            // supersede unpaid penalties with one cumulative record
            let mut superseded = 0;
            for stale in existing.iter().filter(|p| !p.is_paid) {
                s.delete_penalty(stale.id)?;
                superseded += 1;
            }

            let penalty = PenaltyRecord::new(
                due_record_id,
                today,
                preview.amount,
                preview.overdue_days,
                format!(
                    "{} days overdue, {}% penalty",
                    preview.overdue_days,
                    preview.rate.as_percentage()
                ),
            );
            s.insert_penalty(&penalty)?;

            Ok(Assessment {
                outcome: AssessmentOutcome::Assessed {
                    penalty,
                    superseded,
                },
                ..base
            })
        })?;

        if let AssessmentOutcome::Assessed {
            penalty,
            superseded,
        } = &assessment.outcome
        {
            if *superseded > 0 {
                events.emit(Event::PenaltySuperseded {
                    due_record_id,
                    removed: *superseded,
                    penalty_date: today,
                });
            }
            events.emit(Event::PenaltyAssessed {
                policy_id: assessment.policy_id,
                due_record_id,
                amount: penalty.amount,
                days_overdue: assessment.overdue_days,
                rate: assessment.rate,
                penalty_date: today,
            });
        }

        Ok(assessment)
    }

    /// daily batch pass: assess every overdue record of every active,
    /// non-archived policy, then void flagged policies in a separate step
    ///
    /// Voiding is never interleaved with assessment, so no penalty is
    /// written against a policy that is mid-void; each flagged policy is
    /// voided exactly once however many of its installments qualify.
    pub fn assess_all<S: LedgerStore>(
        &self,
        store: &mut S,
        lifecycle: &LifecycleEngine,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<BatchAssessment> {
        let today = time.now().date_naive();

        let mut assessments = Vec::new();
        let mut penalties_written = 0;
        let mut flagged: Vec<(PolicyId, u32)> = Vec::new();

        for policy in store.active_policies()? {
            let schedule = store.due_records(policy.id)?;
            for record in schedule.iter().filter(|r| {
                r.lifecycle.is_normal() && !r.archived && !r.is_fully_paid() && r.due_date < today
            }) {
                let assessment = self.assess(store, record.id, time, events)?;

                if matches!(assessment.outcome, AssessmentOutcome::Assessed { .. }) {
                    penalties_written += 1;
                }
                if assessment.should_void_policy
                    && !flagged.iter().any(|(id, _)| *id == policy.id)
                {
                    flagged.push((policy.id, assessment.overdue_days));
                    events.emit(Event::PolicyVoidFlagged {
                        policy_id: policy.id,
                        due_record_id: record.id,
                        days_overdue: assessment.overdue_days,
                    });
                }
                assessments.push(assessment);
            }
        }

        let mut policies_voided = Vec::new();
        for (policy_id, days_overdue) in &flagged {
            let policy = store.policy(*policy_id)?;
            if policy.status.is_terminal() || policy.is_expired(today) {
                continue;
            }
            lifecycle.void_automatic(store, *policy_id, *days_overdue, time, events)?;
            policies_voided.push(*policy_id);
        }

        Ok(BatchAssessment {
            assessments,
            penalties_written,
            policies_flagged: flagged.into_iter().map(|(id, _)| id).collect(),
            policies_voided,
        })
    }
}
