use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, ReceiptId, StaffId};

/// all events emitted by the collection ledger for the notification subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ReceiptCreated {
        receipt_id: ReceiptId,
        loan_id: LoanId,
        amount: Money,
        allocated: Money,
        suspense_credited: Money,
        collected_on: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    CancellationRequested {
        receipt_id: ReceiptId,
        loan_id: LoanId,
        requested_by: StaffId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    CancellationRejected {
        receipt_id: ReceiptId,
        loan_id: LoanId,
        rejected_by: StaffId,
        timestamp: DateTime<Utc>,
    },
    ReceiptCancelled {
        receipt_id: ReceiptId,
        loan_id: LoanId,
        amount_reversed: Money,
        suspense_reversed: Money,
        approved_by: StaffId,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
