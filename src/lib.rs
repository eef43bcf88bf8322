pub mod allocation;
pub mod config;
pub mod decimal;
pub mod dues;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod query;
pub mod receipt;
pub mod schedule;
pub mod store;
pub mod types;

// re-export key types
pub use allocation::AllocationEngine;
pub use config::{LedgerConfig, SuspensePolicy};
pub use decimal::Money;
pub use dues::DueAggregator;
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::{CollectRequest, CollectionLedger};
pub use query::LedgerQuery;
pub use receipt::{CancellationRequest, Receipt, ReceiptView};
pub use schedule::{Installment, LoanAccount};
pub use store::{LedgerStore, MemoryStore};
pub use types::{
    AllocationLine, AllocationResult, ArrearsStanding, BranchId, CenterId, CycleStatus, DueSheet,
    DueTotals, DueView, InstallmentId, LoanId, ReceiptId, ReceiptStatus, StaffId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
