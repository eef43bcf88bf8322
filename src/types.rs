use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan account
pub type LoanId = Uuid;

/// unique identifier for a receipt
pub type ReceiptId = Uuid;

/// unique identifier for a scheduled installment
pub type InstallmentId = Uuid;

/// identifier for a collector or approver
pub type StaffId = Uuid;

/// branch scope identifier
pub type BranchId = Uuid;

/// center scope identifier
pub type CenterId = Uuid;

/// loan cycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStatus {
    /// cycle accepting collections
    Open,
    /// future or finished cycle, collection blocked
    Closed,
}

/// receipt lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// normal receipt, balances applied
    Active,
    /// a cancellation request awaits a second party
    CancellationPending,
    /// reversed, balances restored
    Cancelled,
}

impl ReceiptStatus {
    /// the full transition table for the receipt state machine
    pub fn can_transition_to(self, next: ReceiptStatus) -> bool {
        matches!(
            (self, next),
            (ReceiptStatus::Active, ReceiptStatus::CancellationPending)
                | (ReceiptStatus::CancellationPending, ReceiptStatus::Cancelled)
                | (ReceiptStatus::CancellationPending, ReceiptStatus::Active)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReceiptStatus::Cancelled)
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReceiptStatus::Active => "active",
            ReceiptStatus::CancellationPending => "cancellation_pending",
            ReceiptStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// one allocated slice of a receipt against a single installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub installment_id: InstallmentId,
    pub penalty: Money,
    pub rental: Money,
}

impl AllocationLine {
    pub fn total(&self) -> Money {
        self.penalty + self.rental
    }
}

/// outcome of running the waterfall over a loan's open installments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub lines: Vec<AllocationLine>,
    /// cash left after every installment is satisfied, credited to suspense
    pub leftover: Money,
}

impl AllocationResult {
    /// total applied across all lines, excluding leftover
    pub fn allocated(&self) -> Money {
        Money::total(self.lines.iter().map(|l| l.total()))
    }
}

/// three-way standing derived from the sign of net arrears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrearsStanding {
    /// net arrears positive, borrower owes overdue money
    Overdue,
    /// net arrears exactly zero
    OnTrack,
    /// suspense exceeds arrears, borrower holds a credit
    Credit,
}

/// computed due projection for one loan on a given date, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueView {
    pub loan_id: LoanId,
    pub branch_id: BranchId,
    pub center_id: CenterId,
    /// unpaid rental + penalty for installments due on or before the query date
    pub due_amount: Money,
    /// total unpaid across the whole schedule
    pub outstanding: Money,
    /// unpaid amounts due strictly before the query date
    pub arrears: Money,
    /// advance credit held against the loan
    pub suspense: Money,
    /// arrears - suspense; sign is a user-facing contract
    pub net_arrears: Money,
    pub can_collect: bool,
}

impl DueView {
    pub fn standing(&self) -> ArrearsStanding {
        if self.net_arrears.is_positive() {
            ArrearsStanding::Overdue
        } else if self.net_arrears.is_negative() {
            ArrearsStanding::Credit
        } else {
            ArrearsStanding::OnTrack
        }
    }
}

/// totals across a due sheet scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DueTotals {
    pub due: Money,
    pub collected: Money,
    pub arrears: Money,
    pub suspense: Money,
}

/// due views plus scope totals for one branch/center/date query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueSheet {
    pub items: Vec<DueView>,
    pub totals: DueTotals,
}
