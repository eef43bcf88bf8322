use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, ReceiptId, ReceiptStatus, StaffId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid collection amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("nothing left to collect for this period on loan {loan_id}")]
    AlreadySettled {
        loan_id: LoanId,
    },

    #[error("collection cycle is closed for loan {loan_id}")]
    CycleClosed {
        loan_id: LoanId,
    },

    #[error("invalid receipt state: current {current}, expected {expected}")]
    InvalidState {
        current: ReceiptStatus,
        expected: &'static str,
    },

    #[error("staff {staff_id} may not approve their own cancellation request")]
    Forbidden {
        staff_id: StaffId,
    },

    #[error("loan not found: {loan_id}")]
    LoanNotFound {
        loan_id: LoanId,
    },

    #[error("receipt not found: {receipt_id}")]
    ReceiptNotFound {
        receipt_id: ReceiptId,
    },

    #[error("cancellation reason must not be empty")]
    ReasonRequired,

    #[error("suspense limit exceeded: balance would reach {balance}, limit {limit}")]
    SuspenseLimitExceeded {
        balance: Money,
        limit: Money,
    },

    #[error("allocation would overpay installment beyond its due amount")]
    OverAllocation,

    #[error("allocation lines do not reproduce the receipt amount: expected {expected}, got {actual}")]
    AllocationMismatch {
        expected: Money,
        actual: Money,
    },

    #[error("concurrent update conflict on loan {loan_id}")]
    Conflict {
        loan_id: LoanId,
    },

    #[error("ledger store lock poisoned")]
    StorePoisoned,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
