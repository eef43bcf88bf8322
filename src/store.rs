use std::collections::HashMap;
use std::sync::RwLock;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::receipt::Receipt;
use crate::schedule::{Installment, LoanAccount};
use crate::types::{AllocationLine, BranchId, CenterId, LoanId, ReceiptId, ReceiptStatus};

/// storage boundary for the collection ledger
///
/// Covers both collaborator stores of the core: loan accounts (balances,
/// suspense, cycle) and the installment schedule, plus receipt persistence.
/// `apply_allocation` / `revert_allocation` are loan-scoped and atomic:
/// either every paid increment and the suspense adjustment land, or nothing
/// does.
pub trait LedgerStore: Send + Sync {
    fn loan(&self, loan_id: LoanId) -> Result<LoanAccount>;

    /// loans for a branch, optionally narrowed to one center
    fn loans_in_scope(
        &self,
        branch_id: BranchId,
        center_id: Option<CenterId>,
    ) -> Result<Vec<LoanAccount>>;

    fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>>;

    /// increase paid amounts per line, reduce loan balances, credit leftover to suspense
    fn apply_allocation(
        &self,
        loan_id: LoanId,
        lines: &[AllocationLine],
        leftover: Money,
    ) -> Result<()>;

    /// decrease paid amounts per line, restore loan balances, debit leftover from suspense
    fn revert_allocation(
        &self,
        loan_id: LoanId,
        lines: &[AllocationLine],
        leftover: Money,
    ) -> Result<()>;

    fn insert_receipt(&self, receipt: Receipt) -> Result<()>;

    fn update_receipt(&self, receipt: &Receipt) -> Result<()>;

    fn receipt(&self, receipt_id: ReceiptId) -> Result<Receipt>;

    /// look up a receipt by its caller-supplied idempotency reference
    fn receipt_by_reference(&self, reference: &str) -> Result<Option<Receipt>>;

    fn receipts_for_loan(&self, loan_id: LoanId) -> Result<Vec<Receipt>>;

    fn pending_receipts(&self) -> Result<Vec<Receipt>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    loans: HashMap<LoanId, LoanAccount>,
    installments: HashMap<LoanId, Vec<Installment>>,
    receipts: HashMap<ReceiptId, Receipt>,
}

/// in-memory ledger store for library users and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_loan(&self, loan: LoanAccount) -> Result<()> {
        let mut inner = self.write()?;
        inner.loans.insert(loan.id, loan);
        Ok(())
    }

    pub fn upsert_installment(&self, installment: Installment) -> Result<()> {
        let mut inner = self.write()?;
        let schedule = inner.installments.entry(installment.loan_id).or_default();
        match schedule.iter_mut().find(|i| i.id == installment.id) {
            Some(existing) => *existing = installment,
            None => schedule.push(installment),
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryInner>> {
        self.inner.read().map_err(|_| LedgerError::StorePoisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryInner>> {
        self.inner.write().map_err(|_| LedgerError::StorePoisoned)
    }
}

impl LedgerStore for MemoryStore {
    fn loan(&self, loan_id: LoanId) -> Result<LoanAccount> {
        self.read()?
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound { loan_id })
    }

    fn loans_in_scope(
        &self,
        branch_id: BranchId,
        center_id: Option<CenterId>,
    ) -> Result<Vec<LoanAccount>> {
        let inner = self.read()?;
        let mut loans: Vec<LoanAccount> = inner
            .loans
            .values()
            .filter(|l| l.branch_id == branch_id)
            .filter(|l| center_id.map_or(true, |c| l.center_id == c))
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.id);
        Ok(loans)
    }

    fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let inner = self.read()?;
        if !inner.loans.contains_key(&loan_id) {
            return Err(LedgerError::LoanNotFound { loan_id });
        }
        Ok(inner.installments.get(&loan_id).cloned().unwrap_or_default())
    }

    fn apply_allocation(
        &self,
        loan_id: LoanId,
        lines: &[AllocationLine],
        leftover: Money,
    ) -> Result<()> {
        let mut inner = self.write()?;

        // stage on clones; commit only once every line has applied
        let mut loan = inner
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound { loan_id })?;
        let mut schedule = inner.installments.get(&loan_id).cloned().unwrap_or_default();

        let mut penalty_total = Money::ZERO;
        let mut rental_total = Money::ZERO;
        for line in lines {
            let installment = schedule
                .iter_mut()
                .find(|i| i.id == line.installment_id)
                .ok_or(LedgerError::OverAllocation)?;
            installment.apply(line)?;
            penalty_total += line.penalty;
            rental_total += line.rental;
        }
        loan.apply_collection(penalty_total, rental_total, leftover);

        inner.loans.insert(loan_id, loan);
        inner.installments.insert(loan_id, schedule);
        Ok(())
    }

    fn revert_allocation(
        &self,
        loan_id: LoanId,
        lines: &[AllocationLine],
        leftover: Money,
    ) -> Result<()> {
        let mut inner = self.write()?;

        let mut loan = inner
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound { loan_id })?;
        let mut schedule = inner.installments.get(&loan_id).cloned().unwrap_or_default();

        let mut penalty_total = Money::ZERO;
        let mut rental_total = Money::ZERO;
        for line in lines {
            let installment = schedule
                .iter_mut()
                .find(|i| i.id == line.installment_id)
                .ok_or(LedgerError::OverAllocation)?;
            installment.revert(line)?;
            penalty_total += line.penalty;
            rental_total += line.rental;
        }
        loan.revert_collection(penalty_total, rental_total, leftover)?;

        inner.loans.insert(loan_id, loan);
        inner.installments.insert(loan_id, schedule);
        Ok(())
    }

    fn insert_receipt(&self, receipt: Receipt) -> Result<()> {
        let mut inner = self.write()?;
        inner.receipts.insert(receipt.id, receipt);
        Ok(())
    }

    fn update_receipt(&self, receipt: &Receipt) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.receipts.contains_key(&receipt.id) {
            return Err(LedgerError::ReceiptNotFound {
                receipt_id: receipt.id,
            });
        }
        inner.receipts.insert(receipt.id, receipt.clone());
        Ok(())
    }

    fn receipt(&self, receipt_id: ReceiptId) -> Result<Receipt> {
        self.read()?
            .receipts
            .get(&receipt_id)
            .cloned()
            .ok_or(LedgerError::ReceiptNotFound { receipt_id })
    }

    fn receipt_by_reference(&self, reference: &str) -> Result<Option<Receipt>> {
        let inner = self.read()?;
        Ok(inner
            .receipts
            .values()
            .find(|r| r.reference.as_deref() == Some(reference))
            .cloned())
    }

    fn receipts_for_loan(&self, loan_id: LoanId) -> Result<Vec<Receipt>> {
        let inner = self.read()?;
        Ok(inner
            .receipts
            .values()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect())
    }

    fn pending_receipts(&self) -> Result<Vec<Receipt>> {
        let inner = self.read()?;
        let mut pending: Vec<Receipt> = inner
            .receipts
            .values()
            .filter(|r| r.status == ReceiptStatus::CancellationPending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }
}
