use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AllocationLine, BranchId, CenterId, CycleStatus, InstallmentId, LoanId};

/// loan account balances tracked by the collection ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanAccount {
    pub id: LoanId,
    pub branch_id: BranchId,
    pub center_id: CenterId,
    pub principal_balance: Money,
    pub penalty_balance: Money,
    /// advance credit held from over-payment
    pub suspense_balance: Money,
    pub cycle: CycleStatus,
}

impl LoanAccount {
    pub fn is_open(&self) -> bool {
        self.cycle == CycleStatus::Open
    }

    /// reduce balances by the allocated portions and credit leftover to suspense
    pub fn apply_collection(&mut self, penalty: Money, rental: Money, leftover: Money) {
        self.penalty_balance = (self.penalty_balance - penalty).max(Money::ZERO);
        self.principal_balance = (self.principal_balance - rental).max(Money::ZERO);
        self.suspense_balance += leftover;
    }

    /// restore balances by the exact portions recorded on a cancelled receipt
    pub fn revert_collection(&mut self, penalty: Money, rental: Money, leftover: Money) -> Result<()> {
        if self.suspense_balance < leftover {
            return Err(LedgerError::OverAllocation);
        }
        self.penalty_balance += penalty;
        self.principal_balance += rental;
        self.suspense_balance -= leftover;
        Ok(())
    }
}

/// one scheduled obligation on a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub due_date: NaiveDate,
    /// principal + interest portion due
    pub rental_due: Money,
    pub penalty_due: Money,
    pub rental_paid: Money,
    pub penalty_paid: Money,
}

impl Installment {
    pub fn penalty_outstanding(&self) -> Money {
        (self.penalty_due - self.penalty_paid).max(Money::ZERO)
    }

    pub fn rental_outstanding(&self) -> Money {
        (self.rental_due - self.rental_paid).max(Money::ZERO)
    }

    pub fn outstanding(&self) -> Money {
        self.penalty_outstanding() + self.rental_outstanding()
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding().is_zero()
    }

    /// increase paid amounts by an allocation line, keeping paid <= due
    pub fn apply(&mut self, line: &AllocationLine) -> Result<()> {
        if line.penalty > self.penalty_outstanding() || line.rental > self.rental_outstanding() {
            return Err(LedgerError::OverAllocation);
        }
        self.penalty_paid += line.penalty;
        self.rental_paid += line.rental;
        Ok(())
    }

    /// decrease paid amounts by the exact line recorded on a cancelled receipt
    pub fn revert(&mut self, line: &AllocationLine) -> Result<()> {
        if line.penalty > self.penalty_paid || line.rental > self.rental_paid {
            return Err(LedgerError::OverAllocation);
        }
        self.penalty_paid -= line.penalty;
        self.rental_paid -= line.rental;
        Ok(())
    }
}
