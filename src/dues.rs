use chrono::NaiveDate;

use crate::decimal::Money;
use crate::schedule::{Installment, LoanAccount};
use crate::types::DueView;

/// due aggregation over a loan's schedule
///
/// Pure read-side computation: nothing here mutates the schedule. The
/// three-way sign of `net_arrears` (overdue / on track / credit) is part of
/// the caller-facing contract, surfaced as `DueView::standing`.
pub struct DueAggregator;

impl DueAggregator {
    pub fn due_view(loan: &LoanAccount, installments: &[Installment], date: NaiveDate) -> DueView {
        let mut due_amount = Money::ZERO;
        let mut outstanding = Money::ZERO;
        let mut arrears = Money::ZERO;

        for installment in installments.iter().filter(|i| i.loan_id == loan.id) {
            let shortfall = installment.outstanding();
            outstanding += shortfall;

            if installment.due_date <= date {
                due_amount += shortfall;
            }
            // strictly before the query date: today's installment is due, not in arrears
            if installment.due_date < date {
                arrears += shortfall;
            }
        }

        let suspense = loan.suspense_balance;
        let net_arrears = arrears - suspense;

        // settled period and closed cycle each block collection on their own
        let can_collect = due_amount.is_positive() && loan.is_open();

        DueView {
            loan_id: loan.id,
            branch_id: loan.branch_id,
            center_id: loan.center_id,
            due_amount,
            outstanding,
            arrears,
            suspense,
            net_arrears,
            can_collect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArrearsStanding, CycleStatus};
    use uuid::Uuid;

    fn loan(suspense: i64, cycle: CycleStatus) -> LoanAccount {
        LoanAccount {
            id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            center_id: Uuid::new_v4(),
            principal_balance: Money::from_major(1_000),
            penalty_balance: Money::ZERO,
            suspense_balance: Money::from_major(suspense),
            cycle,
        }
    }

    fn installment(loan_id: Uuid, due: (i32, u32, u32), penalty: i64, rental: i64) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            loan_id,
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            rental_due: Money::from_major(rental),
            penalty_due: Money::from_major(penalty),
            rental_paid: Money::ZERO,
            penalty_paid: Money::ZERO,
        }
    }

    fn query_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_due_vs_arrears_split() {
        let loan = loan(0, CycleStatus::Open);
        let schedule = vec![
            // overdue
            installment(loan.id, (2024, 2, 1), 10, 90),
            // due today, not yet arrears
            installment(loan.id, (2024, 3, 1), 0, 100),
            // future, outstanding only
            installment(loan.id, (2024, 4, 1), 0, 100),
        ];

        let view = DueAggregator::due_view(&loan, &schedule, query_date());

        assert_eq!(view.due_amount, Money::from_major(200));
        assert_eq!(view.arrears, Money::from_major(100));
        assert_eq!(view.outstanding, Money::from_major(300));
        assert!(view.can_collect);
    }

    #[test]
    fn test_netting_sign_contract() {
        // arrears 500, suspense 500 => on track
        let loan_even = loan(500, CycleStatus::Open);
        let schedule = vec![installment(loan_even.id, (2024, 1, 1), 0, 500)];
        let view = DueAggregator::due_view(&loan_even, &schedule, query_date());
        assert_eq!(view.net_arrears, Money::ZERO);
        assert_eq!(view.standing(), ArrearsStanding::OnTrack);

        // arrears 300, suspense 500 => credit of 200
        let loan_credit = loan(500, CycleStatus::Open);
        let schedule = vec![installment(loan_credit.id, (2024, 1, 1), 0, 300)];
        let view = DueAggregator::due_view(&loan_credit, &schedule, query_date());
        assert_eq!(view.net_arrears, Money::from_major(-200));
        assert_eq!(view.standing(), ArrearsStanding::Credit);

        // arrears 500, no suspense => overdue
        let loan_overdue = loan(0, CycleStatus::Open);
        let schedule = vec![installment(loan_overdue.id, (2024, 1, 1), 0, 500)];
        let view = DueAggregator::due_view(&loan_overdue, &schedule, query_date());
        assert_eq!(view.net_arrears, Money::from_major(500));
        assert_eq!(view.standing(), ArrearsStanding::Overdue);
    }

    #[test]
    fn test_cannot_collect_when_settled() {
        let loan = loan(0, CycleStatus::Open);
        let mut paid = installment(loan.id, (2024, 2, 1), 0, 100);
        paid.rental_paid = Money::from_major(100);

        let view = DueAggregator::due_view(&loan, &[paid], query_date());
        assert_eq!(view.due_amount, Money::ZERO);
        assert!(!view.can_collect);
    }

    #[test]
    fn test_cannot_collect_when_cycle_closed() {
        let loan = loan(0, CycleStatus::Closed);
        let schedule = vec![installment(loan.id, (2024, 2, 1), 0, 100)];

        let view = DueAggregator::due_view(&loan, &schedule, query_date());
        // money is due, yet the closed cycle independently blocks collection
        assert_eq!(view.due_amount, Money::from_major(100));
        assert!(!view.can_collect);
    }

    #[test]
    fn test_other_loans_are_ignored() {
        let loan = loan(0, CycleStatus::Open);
        let foreign = installment(Uuid::new_v4(), (2024, 1, 1), 0, 999);
        let own = installment(loan.id, (2024, 2, 1), 0, 100);

        let view = DueAggregator::due_view(&loan, &[foreign, own], query_date());
        assert_eq!(view.due_amount, Money::from_major(100));
        assert_eq!(view.outstanding, Money::from_major(100));
    }
}
