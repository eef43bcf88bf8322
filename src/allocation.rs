use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::schedule::Installment;
use crate::types::{AllocationLine, AllocationResult};

/// waterfall allocation engine
///
/// Splits a cash amount across a loan's open installments in a fixed order:
/// oldest due date first (ties broken by installment id), and within each
/// installment the penalty shortfall before the rental shortfall. Pure over
/// its inputs; persistence of the resulting mutations belongs to the
/// receipt lifecycle.
pub struct AllocationEngine;

impl AllocationEngine {
    pub fn allocate(installments: &[Installment], cash: Money) -> Result<AllocationResult> {
        if !cash.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: cash });
        }

        let mut open: Vec<&Installment> =
            installments.iter().filter(|i| !i.is_settled()).collect();
        open.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));

        let mut remaining = cash;
        let mut lines = Vec::new();

        for installment in open {
            let penalty = remaining.min(installment.penalty_outstanding());
            remaining -= penalty;

            let rental = remaining.min(installment.rental_outstanding());
            remaining -= rental;

            // record a line whenever either portion was touched
            if !penalty.is_zero() || !rental.is_zero() {
                lines.push(AllocationLine {
                    installment_id: installment.id,
                    penalty,
                    rental,
                });
            }

            if remaining.is_zero() {
                break;
            }
        }

        Ok(AllocationResult {
            lines,
            leftover: remaining,
        })
    }
}


#[cfg(test)]
mod props {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// strategy for one unpaid-or-partially-paid installment with 2dp amounts
    fn installment_strategy() -> impl Strategy<Value = Installment> {
        (0i64..50_000, 0i64..200_000, 0u64..365).prop_flat_map(|(penalty, rental, day_offset)| {
            (0..=penalty, 0..=rental).prop_map(move |(penalty_paid, rental_paid)| Installment {
                id: Uuid::new_v4(),
                loan_id: Uuid::new_v4(),
                due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Days::new(day_offset),
                penalty_due: Money::from_minor(penalty),
                rental_due: Money::from_minor(rental),
                penalty_paid: Money::from_minor(penalty_paid),
                rental_paid: Money::from_minor(rental_paid),
            })
        })
    }

    proptest! {
        #[test]
        fn conservation(
            schedule in proptest::collection::vec(installment_strategy(), 0..12),
            cash_cents in 1i64..1_000_000,
        ) {
            let cash = Money::from_minor(cash_cents);
            let result = AllocationEngine::allocate(&schedule, cash).unwrap();

            prop_assert_eq!(result.allocated() + result.leftover, cash);

            // no line exceeds the installment's shortfall
            for line in &result.lines {
                let inst = schedule.iter().find(|i| i.id == line.installment_id).unwrap();
                prop_assert!(line.penalty <= inst.penalty_outstanding());
                prop_assert!(line.rental <= inst.rental_outstanding());
            }
        }

        #[test]
        fn determinism(
            schedule in proptest::collection::vec(installment_strategy(), 0..12),
            cash_cents in 1i64..1_000_000,
        ) {
            let cash = Money::from_minor(cash_cents);
            let first = AllocationEngine::allocate(&schedule, cash).unwrap();
            let second = AllocationEngine::allocate(&schedule, cash).unwrap();

            prop_assert_eq!(first, second);
        }
    }
}
