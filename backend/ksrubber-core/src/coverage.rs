// src/coverage.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::ksrubber_data::Expenses;
use crate::month_summary::MonthTotals;

/// How much of the month's target pay the reported income covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    /// Base income plus overtime pay: what the month would pay with no leave.
    pub without_leave_salary: Decimal,
    /// Positive is a shortfall, negative a surplus.
    pub shortfall: Decimal,
    /// Always within `0..=100`.
    pub percent_covered: Decimal,
}

impl Coverage {
    pub fn compute(base_income: Decimal, total_monthly_pay: Decimal, month_income: Decimal) -> Self {
        let without_leave_salary = base_income.saturating_add(total_monthly_pay);
        let shortfall = without_leave_salary.saturating_sub(month_income);

        // Both operands are positive here, so an overflow means the ratio is
        // far above 100%.
        let percent_covered = if without_leave_salary <= Decimal::ZERO || month_income <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            month_income
                .checked_div(without_leave_salary)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ONE_HUNDRED)
                .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        };

        Self {
            without_leave_salary,
            shortfall,
            percent_covered,
        }
    }

    pub fn is_shortfall(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Everything the monthly summary screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSummary {
    pub totals: MonthTotals,
    pub base_income: Decimal,
    pub month_income: Decimal,
    pub expenses: Expenses,
    pub coverage: Coverage,
}

impl MonthSummary {
    pub fn new(totals: MonthTotals, base_income: Decimal, month_income: Decimal, expenses: Expenses) -> Self {
        Self {
            coverage: Coverage::compute(base_income, totals.total_pay, month_income),
            totals,
            base_income,
            month_income,
            expenses,
        }
    }

    /// Headline total: base plus overtime pay. Expenses are shown next to it
    /// but not subtracted.
    pub fn net_total(&self) -> Decimal {
        self.coverage.without_leave_salary
    }
}

/// Fixed two-decimal rendering used for every amount and hour figure.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

pub fn format_currency(value: Decimal) -> String {
    format!("₹ {}", format_amount(value))
}
