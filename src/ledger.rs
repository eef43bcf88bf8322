use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::allocation::AllocationEngine;
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::dues::DueAggregator;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::query::LedgerQuery;
use crate::receipt::Receipt;
use crate::store::LedgerStore;
use crate::types::{LoanId, ReceiptId, StaffId};

/// collection request
#[derive(Debug, Clone, PartialEq)]
pub struct CollectRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    /// defaults to the provider's current date
    pub collected_on: Option<NaiveDate>,
    /// caller-generated idempotency token; retries with the same token
    /// return the stored receipt unchanged
    pub reference: Option<String>,
}

/// per-loan lock registry serializing mutations
///
/// Operations on distinct loans never contend; reads take no loan lock.
#[derive(Debug, Default)]
struct LoanLocks {
    slots: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
}

impl LoanLocks {
    fn with<T>(&self, loan_id: LoanId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| LedgerError::Conflict { loan_id })?;
            slots
                .entry(loan_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = slot
            .lock()
            .map_err(|_| LedgerError::Conflict { loan_id })?;
        f()
    }
}

/// receipt lifecycle manager
///
/// Owns the mutating path of the ledger: collecting cash into a receipt and
/// driving the two-party cancellation workflow. Every mutation runs inside
/// the per-loan critical section and re-validates its preconditions there,
/// so concurrent workers cannot double-allocate against the same schedule.
pub struct CollectionLedger<S: LedgerStore> {
    store: Arc<S>,
    config: LedgerConfig,
    locks: LoanLocks,
    events: Mutex<EventStore>,
}

impl<S: LedgerStore> CollectionLedger<S> {
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            locks: LoanLocks::default(),
            events: Mutex::new(EventStore::new()),
        }
    }

    /// read-path companion over the same store
    pub fn query(&self) -> LedgerQuery<S> {
        LedgerQuery::new(Arc::clone(&self.store))
    }

    /// drain events emitted since the last call, for the notification subsystem
    pub fn take_events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut events) => events.take_events(),
            Err(_) => Vec::new(),
        }
    }

    fn emit(&self, event: Event) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| LedgerError::StorePoisoned)?
            .emit(event);
        Ok(())
    }

    /// collect a cash payment into a new active receipt
    ///
    /// Collectability is re-checked inside the loan's critical section to
    /// close the race between two workers passing the due check together.
    pub fn collect(&self, request: CollectRequest, time: &SafeTimeProvider) -> Result<Receipt> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount,
            });
        }

        let now = time.now();
        let collected_on = request.collected_on.unwrap_or_else(|| now.date_naive());
        let loan_id = request.loan_id;

        self.locks.with(loan_id, || {
            if let Some(reference) = request.reference.as_deref() {
                if let Some(existing) = self.store.receipt_by_reference(reference)? {
                    debug!(
                        receipt_id = %existing.id,
                        reference = reference,
                        "returning existing receipt for idempotency token"
                    );
                    return Ok(existing);
                }
            }

            let loan = self.store.loan(loan_id)?;
            let installments = self.store.installments(loan_id)?;

            if !loan.is_open() {
                return Err(LedgerError::CycleClosed { loan_id });
            }
            let view = DueAggregator::due_view(&loan, &installments, collected_on);
            if !view.due_amount.is_positive() {
                return Err(LedgerError::AlreadySettled { loan_id });
            }

            let allocation = AllocationEngine::allocate(&installments, request.amount)?;

            if let Some(limit) = self.config.suspense.limit {
                let prospective = loan.suspense_balance + allocation.leftover;
                if prospective > limit {
                    return Err(LedgerError::SuspenseLimitExceeded {
                        balance: prospective,
                        limit,
                    });
                }
            }

            let receipt = Receipt::from_allocation(
                loan_id,
                request.reference.clone(),
                request.amount,
                collected_on,
                allocation,
                now,
            )?;

            self.store
                .apply_allocation(loan_id, &receipt.lines, receipt.leftover)?;
            self.store.insert_receipt(receipt.clone())?;

            self.emit(Event::ReceiptCreated {
                receipt_id: receipt.id,
                loan_id,
                amount: receipt.amount,
                allocated: receipt.allocated(),
                suspense_credited: receipt.leftover,
                collected_on,
                timestamp: now,
            })?;
            info!(
                loan_id = %loan_id,
                receipt_id = %receipt.id,
                amount = %receipt.amount,
                leftover = %receipt.leftover,
                "collected payment"
            );

            Ok(receipt)
        })
    }

    /// open a cancellation request against an active receipt
    pub fn request_cancellation(
        &self,
        receipt_id: ReceiptId,
        reason: &str,
        requested_by: StaffId,
        time: &SafeTimeProvider,
    ) -> Result<Receipt> {
        let loan_id = self.store.receipt(receipt_id)?.loan_id;
        let now = time.now();

        self.locks.with(loan_id, || {
            let mut receipt = self.store.receipt(receipt_id)?;
            receipt.request_cancellation(reason, requested_by, now)?;
            self.store.update_receipt(&receipt)?;

            self.emit(Event::CancellationRequested {
                receipt_id,
                loan_id,
                requested_by,
                reason: reason.trim().to_string(),
                timestamp: now,
            })?;
            info!(
                receipt_id = %receipt_id,
                requested_by = %requested_by,
                "cancellation requested"
            );

            Ok(receipt)
        })
    }

    /// approve a pending cancellation and replay the inverse allocation
    ///
    /// The inverse is replayed from the receipt's recorded lines and
    /// leftover, never recomputed from current balances, so the reversal is
    /// exact even after later receipts on other installments.
    pub fn approve_cancellation(
        &self,
        receipt_id: ReceiptId,
        approved_by: StaffId,
        time: &SafeTimeProvider,
    ) -> Result<Receipt> {
        let loan_id = self.store.receipt(receipt_id)?.loan_id;
        let now = time.now();

        self.locks.with(loan_id, || {
            let mut receipt = self.store.receipt(receipt_id)?;
            receipt.approve_cancellation(approved_by, now)?;

            self.store
                .revert_allocation(loan_id, &receipt.lines, receipt.leftover)?;
            self.store.update_receipt(&receipt)?;

            self.emit(Event::ReceiptCancelled {
                receipt_id,
                loan_id,
                amount_reversed: receipt.amount,
                suspense_reversed: receipt.leftover,
                approved_by,
                timestamp: now,
            })?;
            info!(
                receipt_id = %receipt_id,
                approved_by = %approved_by,
                "receipt cancelled"
            );

            Ok(receipt)
        })
    }

    /// reject a pending cancellation; the receipt resumes normal life
    pub fn reject_cancellation(
        &self,
        receipt_id: ReceiptId,
        rejected_by: StaffId,
        time: &SafeTimeProvider,
    ) -> Result<Receipt> {
        let loan_id = self.store.receipt(receipt_id)?.loan_id;
        let now = time.now();

        self.locks.with(loan_id, || {
            let mut receipt = self.store.receipt(receipt_id)?;
            receipt.reject_cancellation(rejected_by, now)?;
            self.store.update_receipt(&receipt)?;

            self.emit(Event::CancellationRejected {
                receipt_id,
                loan_id,
                rejected_by,
                timestamp: now,
            })?;
            info!(
                receipt_id = %receipt_id,
                rejected_by = %rejected_by,
                "cancellation rejected"
            );

            Ok(receipt)
        })
    }

    /// the approval queue: every receipt awaiting a second party
    pub fn pending_cancellations(&self) -> Result<Vec<Receipt>> {
        self.store.pending_receipts()
    }
}
