use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

use crate::decimal::Money;
use crate::dues::DueAggregator;
use crate::errors::Result;
use crate::receipt::Receipt;
use crate::store::LedgerStore;
use crate::types::{BranchId, CenterId, DueSheet, DueTotals, LoanId, ReceiptStatus};

/// ledger query service
///
/// Read-only composition over the store, so callers and reporting never
/// recompute netting or allocation logic themselves. Holds no loan locks;
/// reads observe whatever consistent snapshot the store returns.
pub struct LedgerQuery<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> LedgerQuery<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// receipts for a loan, newest collection first
    pub fn history(&self, loan_id: LoanId) -> Result<Vec<Receipt>> {
        // unknown loans surface as NotFound rather than an empty history
        self.store.loan(loan_id)?;

        let mut receipts = self.store.receipts_for_loan(loan_id)?;
        receipts.sort_by(|a, b| {
            b.collected_on
                .cmp(&a.collected_on)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(receipts)
    }

    /// due sheet for a branch, optionally narrowed to a center
    pub fn due_payments(
        &self,
        branch_id: BranchId,
        center_id: Option<CenterId>,
        date: Option<NaiveDate>,
        time: &SafeTimeProvider,
    ) -> Result<DueSheet> {
        let date = date.unwrap_or_else(|| time.now().date_naive());
        let loans = self.store.loans_in_scope(branch_id, center_id)?;

        let mut items = Vec::with_capacity(loans.len());
        let mut totals = DueTotals::default();

        for loan in &loans {
            let installments = self.store.installments(loan.id)?;
            let view = DueAggregator::due_view(loan, &installments, date);

            totals.due += view.due_amount;
            totals.arrears += view.arrears;
            totals.suspense += view.suspense;
            totals.collected += self.collected_on_date(loan.id, date)?;

            items.push(view);
        }

        Ok(DueSheet { items, totals })
    }

    /// cash taken on active receipts for one loan on one date
    fn collected_on_date(&self, loan_id: LoanId, date: NaiveDate) -> Result<Money> {
        let receipts = self.store.receipts_for_loan(loan_id)?;
        Ok(Money::total(
            receipts
                .iter()
                .filter(|r| r.status == ReceiptStatus::Active && r.collected_on == date)
                .map(|r| r.amount),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::decimal::Money;
    use crate::errors::LedgerError;
    use crate::ledger::{CollectRequest, CollectionLedger};
    use crate::schedule::{Installment, LoanAccount};
    use crate::store::MemoryStore;
    use crate::types::CycleStatus;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn time_provider() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn seed_loan(store: &MemoryStore, branch_id: Uuid, center_id: Uuid) -> LoanId {
        let loan_id = Uuid::new_v4();
        store
            .upsert_loan(LoanAccount {
                id: loan_id,
                branch_id,
                center_id,
                principal_balance: Money::from_major(300),
                penalty_balance: Money::from_major(50),
                suspense_balance: Money::ZERO,
                cycle: CycleStatus::Open,
            })
            .unwrap();
        store
            .upsert_installment(Installment {
                id: Uuid::new_v4(),
                loan_id,
                due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                rental_due: Money::from_major(100),
                penalty_due: Money::from_major(50),
                rental_paid: Money::ZERO,
                penalty_paid: Money::ZERO,
            })
            .unwrap();
        store
            .upsert_installment(Installment {
                id: Uuid::new_v4(),
                loan_id,
                due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                rental_due: Money::from_major(200),
                penalty_due: Money::ZERO,
                rental_paid: Money::ZERO,
                penalty_paid: Money::ZERO,
            })
            .unwrap();
        loan_id
    }

    #[test]
    fn test_history_orders_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let loan_id = seed_loan(&store, Uuid::new_v4(), Uuid::new_v4());
        let ledger = CollectionLedger::new(Arc::clone(&store), LedgerConfig::default());
        let time = time_provider();

        let older = ledger
            .collect(
                CollectRequest {
                    loan_id,
                    amount: Money::from_major(50),
                    collected_on: NaiveDate::from_ymd_opt(2024, 2, 1),
                    reference: None,
                },
                &time,
            )
            .unwrap();
        let newer = ledger
            .collect(
                CollectRequest {
                    loan_id,
                    amount: Money::from_major(50),
                    collected_on: NaiveDate::from_ymd_opt(2024, 3, 1),
                    reference: None,
                },
                &time,
            )
            .unwrap();

        let history = ledger.query().history(loan_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, newer.id);
        assert_eq!(history[1].id, older.id);
    }

    #[test]
    fn test_history_for_unknown_loan_fails() {
        let query = LedgerQuery::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            query.history(Uuid::new_v4()),
            Err(LedgerError::LoanNotFound { .. })
        ));
    }

    #[test]
    fn test_due_sheet_totals() {
        let store = Arc::new(MemoryStore::new());
        let branch = Uuid::new_v4();
        let center = Uuid::new_v4();
        let first = seed_loan(&store, branch, center);
        let _second = seed_loan(&store, branch, center);
        // other branch, excluded from scope
        seed_loan(&store, Uuid::new_v4(), Uuid::new_v4());

        let ledger = CollectionLedger::new(Arc::clone(&store), LedgerConfig::default());
        let time = time_provider();

        // 120 collected today against the first loan
        ledger
            .collect(
                CollectRequest {
                    loan_id: first,
                    amount: Money::from_major(120),
                    collected_on: None,
                    reference: None,
                },
                &time,
            )
            .unwrap();

        let sheet = ledger
            .query()
            .due_payments(branch, None, None, &time)
            .unwrap();

        assert_eq!(sheet.items.len(), 2);
        // first loan: 350 due - 120 paid = 230; second untouched: 350
        assert_eq!(sheet.totals.due, Money::from_major(580));
        // arrears counts only the january installments (150 each), minus payment
        assert_eq!(sheet.totals.arrears, Money::from_major(180));
        assert_eq!(sheet.totals.collected, Money::from_major(120));
        assert_eq!(sheet.totals.suspense, Money::ZERO);
    }

    #[test]
    fn test_cancelled_receipts_excluded_from_collected_totals() {
        let store = Arc::new(MemoryStore::new());
        let branch = Uuid::new_v4();
        let loan_id = seed_loan(&store, branch, Uuid::new_v4());
        let ledger = CollectionLedger::new(Arc::clone(&store), LedgerConfig::default());
        let time = time_provider();

        let receipt = ledger
            .collect(
                CollectRequest {
                    loan_id,
                    amount: Money::from_major(120),
                    collected_on: None,
                    reference: None,
                },
                &time,
            )
            .unwrap();
        ledger
            .request_cancellation(receipt.id, "wrong member", Uuid::new_v4(), &time)
            .unwrap();
        ledger
            .approve_cancellation(receipt.id, Uuid::new_v4(), &time)
            .unwrap();

        let sheet = ledger
            .query()
            .due_payments(branch, None, None, &time)
            .unwrap();
        assert_eq!(sheet.totals.collected, Money::ZERO);
        // the reversal restored the full due amount
        assert_eq!(sheet.totals.due, Money::from_major(350));
    }

    #[test]
    fn test_center_filter_narrows_sheet() {
        let store = Arc::new(MemoryStore::new());
        let branch = Uuid::new_v4();
        let center_a = Uuid::new_v4();
        let center_b = Uuid::new_v4();
        seed_loan(&store, branch, center_a);
        seed_loan(&store, branch, center_b);

        let query = LedgerQuery::new(store);
        let time = time_provider();

        let sheet = query
            .due_payments(branch, Some(center_a), None, &time)
            .unwrap();
        assert_eq!(sheet.items.len(), 1);
        assert_eq!(sheet.items[0].center_id, center_a);
    }
}
