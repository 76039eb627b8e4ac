pub mod allocation;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod penalty;
pub mod queries;
pub mod records;
pub mod schedule;
pub mod store;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use allocation::{PaymentEngine, PaymentReceipt};
pub use lifecycle::{CancellationResult, LifecycleEngine};
pub use penalty::{
    Assessment, AssessmentOutcome, BatchAssessment, PenaltyAssessor, PenaltyConfig,
    PenaltyPreview,
};
pub use queries::PolicyAccountSummary;
pub use records::{DueRecord, DueSchedule, PenaltyRecord, Policy};
pub use schedule::ScheduleGenerator;
pub use store::{LedgerStore, MemoryStore};
pub use types::{
    DueClassification, DueLifecycle, DueRecordId, InstallmentKind, PaymentBreakdown,
    PaymentChannel, PenaltyId, PolicyId, PolicyStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
