use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("policy not found: {id}")]
    PolicyNotFound {
        id: Uuid,
    },

    #[error("due record not found: {id}")]
    DueRecordNotFound {
        id: Uuid,
    },

    #[error("penalty record not found: {id}")]
    PenaltyNotFound {
        id: Uuid,
    },

    #[error("invalid state transition: cannot {attempted} a {current} policy")]
    InvalidStateTransition {
        current: String,
        attempted: String,
    },

    #[error("payment exceeds outstanding balance: outstanding {outstanding}, requested {requested}")]
    OverPayment {
        outstanding: Money,
        requested: Money,
    },

    #[error("payment could not be fully allocated: {remaining} left over")]
    UnallocatedFunds {
        remaining: Money,
    },

    #[error("penalty already assessed for due record {due_record_id} on {date}")]
    DuplicatePenalty {
        due_record_id: Uuid,
        date: NaiveDate,
    },

    #[error("irreversible action blocked: {message}")]
    IrreversibleActionBlocked {
        message: String,
    },

    #[error("calculation error: {message}")]
    Calculation {
        message: String,
    },

    #[error("store failure: {message}")]
    Store {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
