// src/month_summary.rs

use rust_decimal::Decimal;

use crate::calendar::CalendarDay;
use crate::die_catalog::DieCatalog;
use crate::ksrubber_data::accumulate;

/// Overtime and pay totals for a synthesized month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthTotals {
    pub total_overtime_hours: Decimal,
    pub total_pay: Decimal,
    pub recorded_days: usize,
    pub missing_days: usize,
    pub leave_days: usize,
}

/// Does `day` survive a die-name search? Missing days always do, so gaps stay
/// visible under a filter. A blank search keeps everything.
pub fn matches_search(day: &CalendarDay, search: Option<&str>, catalog: &DieCatalog) -> bool {
    let needle = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_lowercase(),
        None => return true,
    };

    match day.record() {
        None => true,
        Some(record) => catalog
            .resolved_names(record)
            .iter()
            .any(|name| name.to_lowercase().contains(&needle)),
    }
}

pub fn filter_days<'a>(
    days: &'a [CalendarDay],
    search: Option<&str>,
    catalog: &DieCatalog,
) -> Vec<&'a CalendarDay> {
    days.iter()
        .filter(|day| matches_search(day, search, catalog))
        .collect()
}

/// Sums overtime and pay over the recorded days that pass `search`.
///
/// Values the backend sent as garbage were already decoded as zero, and the
/// sums are exact decimal additions, so the result does not depend on the
/// order of `days` unless a value is large enough to overflow the total, in
/// which case that value is skipped. Leave days count separately and add no overtime.
pub fn aggregate(days: &[CalendarDay], search: Option<&str>, catalog: &DieCatalog) -> MonthTotals {
    days.iter()
        .filter(|day| matches_search(day, search, catalog))
        .fold(MonthTotals::default(), |mut totals, day| {
            match day.record() {
                None => totals.missing_days += 1,
                Some(record) => {
                    totals.recorded_days += 1;
                    if catalog.is_leave_record(record) {
                        totals.leave_days += 1;
                    } else {
                        totals.total_overtime_hours =
                            accumulate(totals.total_overtime_hours, record.total_overtime(), "overtime hours");
                    }
                    totals.total_pay = accumulate(totals.total_pay, record.monthly_pay, "monthly pay");
                }
            }
            totals
        })
}
