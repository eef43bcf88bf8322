use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AllocationLine, AllocationResult, LoanId, ReceiptId, ReceiptStatus, StaffId};

/// pending cancellation request attached to a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub reason: String,
    pub requested_by: StaffId,
    pub requested_at: DateTime<Utc>,
}

/// durable record of one collection event
///
/// Allocation lines and leftover never change after creation; a reversal
/// replays their inverse against the schedule instead of rewriting history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    /// caller-supplied idempotency token
    pub reference: Option<String>,
    pub loan_id: LoanId,
    /// cash tendered
    pub amount: Money,
    pub collected_on: NaiveDate,
    pub status: ReceiptStatus,
    pub lines: Vec<AllocationLine>,
    /// portion of the amount credited to suspense, recorded for exact reversal
    pub leftover: Money,
    pub cancellation: Option<CancellationRequest>,
    pub resolved_by: Option<StaffId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    /// build an active receipt from an allocation outcome
    pub fn from_allocation(
        loan_id: LoanId,
        reference: Option<String>,
        amount: Money,
        collected_on: NaiveDate,
        allocation: AllocationResult,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let reproduced = allocation.allocated() + allocation.leftover;
        if reproduced != amount {
            return Err(LedgerError::AllocationMismatch {
                expected: amount,
                actual: reproduced,
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            reference,
            loan_id,
            amount,
            collected_on,
            status: ReceiptStatus::Active,
            lines: allocation.lines,
            leftover: allocation.leftover,
            cancellation: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
        })
    }

    /// total applied to installments, excluding the suspense leftover
    pub fn allocated(&self) -> Money {
        Money::total(self.lines.iter().map(|l| l.total()))
    }

    pub fn penalty_total(&self) -> Money {
        Money::total(self.lines.iter().map(|l| l.penalty))
    }

    pub fn rental_total(&self) -> Money {
        Money::total(self.lines.iter().map(|l| l.rental))
    }

    /// single gate for every status change
    fn transition(&mut self, next: ReceiptStatus, expected: &'static str) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::InvalidState {
                current: self.status,
                expected,
            });
        }
        self.status = next;
        Ok(())
    }

    /// move an active receipt into the approval queue
    pub fn request_cancellation(
        &mut self,
        reason: &str,
        requested_by: StaffId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != ReceiptStatus::Active {
            return Err(LedgerError::InvalidState {
                current: self.status,
                expected: "active",
            });
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired);
        }

        self.transition(ReceiptStatus::CancellationPending, "active")?;
        self.cancellation = Some(CancellationRequest {
            reason: reason.to_string(),
            requested_by,
            requested_at: now,
        });
        Ok(())
    }

    /// void a pending receipt; the requester may not approve their own request
    pub fn approve_cancellation(&mut self, approved_by: StaffId, now: DateTime<Utc>) -> Result<()> {
        let requested_by = match &self.cancellation {
            Some(request) if self.status == ReceiptStatus::CancellationPending => {
                request.requested_by
            }
            _ => {
                return Err(LedgerError::InvalidState {
                    current: self.status,
                    expected: "cancellation_pending",
                })
            }
        };
        if requested_by == approved_by {
            return Err(LedgerError::Forbidden {
                staff_id: approved_by,
            });
        }

        self.transition(ReceiptStatus::Cancelled, "cancellation_pending")?;
        self.resolved_by = Some(approved_by);
        self.resolved_at = Some(now);
        Ok(())
    }

    /// return a pending receipt to normal life, clearing the request
    pub fn reject_cancellation(&mut self, rejected_by: StaffId, now: DateTime<Utc>) -> Result<()> {
        if self.status != ReceiptStatus::CancellationPending {
            return Err(LedgerError::InvalidState {
                current: self.status,
                expected: "cancellation_pending",
            });
        }

        self.transition(ReceiptStatus::Active, "cancellation_pending")?;
        self.cancellation = None;
        self.resolved_by = Some(rejected_by);
        self.resolved_at = Some(now);
        Ok(())
    }

    pub fn requested_by(&self) -> Option<StaffId> {
        self.cancellation.as_ref().map(|c| c.requested_by)
    }
}

/// serializable summary of a receipt for callers rendering history
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptView {
    pub id: ReceiptId,
    pub loan_id: LoanId,
    pub status: ReceiptStatus,
    pub amount: Money,
    pub allocated: Money,
    pub penalty_total: Money,
    pub rental_total: Money,
    pub suspense_credited: Money,
    pub collected_on: NaiveDate,
    pub line_count: usize,
    pub cancellation_reason: Option<String>,
}

impl ReceiptView {
    pub fn from_receipt(receipt: &Receipt) -> Self {
        Self {
            id: receipt.id,
            loan_id: receipt.loan_id,
            status: receipt.status,
            amount: receipt.amount,
            allocated: receipt.allocated(),
            penalty_total: receipt.penalty_total(),
            rental_total: receipt.rental_total(),
            suspense_credited: receipt.leftover,
            collected_on: receipt.collected_on,
            line_count: receipt.lines.len(),
            cancellation_reason: receipt.cancellation.as_ref().map(|c| c.reason.clone()),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
