// src/dashboard_tests.rs

#[cfg(test)]
mod tests {
    use crate::calendar::{DayStatus, MonthPeriod};
    use crate::dashboard::*;
    use crate::ksrubber_data::{Expenses, MonthlyIncomeTotals};
    use crate::test_support::{date, die, record, FakeApi};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn seeded_api() -> FakeApi {
        let api = FakeApi::new();
        {
            let mut state = api.state();
            state.dies = vec![die("d1", "Ring 10", "Bosch"), die("d2", "Bush 4", "Bosch")];
            state.records = vec![
                record("1", "2024-03-01", &["d1"], &[dec!(1.5)], &[dec!(9)], dec!(1200)),
                record("2", "2024-03-02", &["d2"], &[dec!(2)], &[dec!(10)], dec!(1800)),
            ];
            state.totals = MonthlyIncomeTotals {
                total_income: dec!(52000),
                total_tea: dec!(300),
                total_water: dec!(120),
            };
            state.base_income = dec!(20000);
            state.month_income.insert((2024, 3), dec!(18000));
            state.month_income.insert((2024, 2), dec!(17500));
        }
        api
    }

    #[tokio::test]
    async fn test_load_populates_every_source() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));

        dashboard.load(&api).await;

        assert!(dashboard.failures().is_empty());
        assert_eq!(dashboard.catalog().len(), 2);
        assert_eq!(dashboard.records().len(), 2);
        assert_eq!(dashboard.month_income(), dec!(18000));
        assert_eq!(dashboard.settings().base_income(), dec!(20000));
        assert_eq!(dashboard.settings().committed_expenses(), Expenses::new(dec!(300), dec!(120)));

        let summary = dashboard.summary(None);
        assert_eq!(summary.totals.total_pay, dec!(3000));
        assert_eq!(summary.coverage.without_leave_salary, dec!(23000));
        assert_eq!(summary.coverage.shortfall, dec!(5000));
        assert_eq!(summary.coverage.percent_covered.round_dp(2), dec!(78.26));
    }

    #[tokio::test]
    async fn test_one_failed_source_does_not_blank_the_others() {
        let api = seeded_api();
        api.fail("list_daily_production");
        api.fail("base_income");
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));

        dashboard.load(&api).await;

        assert_eq!(dashboard.failures().len(), 2);
        assert!(dashboard.failure(DataSource::Productions).is_some());
        assert!(dashboard.failure(DataSource::BaseIncome).is_some());
        assert_eq!(dashboard.catalog().len(), 2);
        assert_eq!(dashboard.month_income(), dec!(18000));
        assert_eq!(dashboard.settings().base_income(), Decimal::ZERO);

        api.recover("list_daily_production");
        assert!(dashboard.refresh_records(&api).await);
        assert!(dashboard.failure(DataSource::Productions).is_none());
        assert_eq!(dashboard.records().len(), 2);
    }

    #[tokio::test]
    async fn test_month_income_failure_shows_zero() {
        let api = seeded_api();
        api.fail("month_income");
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));

        dashboard.load(&api).await;

        assert_eq!(dashboard.month_income(), Decimal::ZERO);
        assert!(dashboard.failure(DataSource::MonthIncome).is_some());
        assert_eq!(dashboard.summary(None).coverage.percent_covered, Decimal::ZERO);
    }

    #[test]
    fn test_stale_result_is_discarded_after_month_switch() {
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        let march_ticket = dashboard.ticket();

        dashboard.select_period(MonthPeriod::new(2024, 2).unwrap());
        let february_ticket = dashboard.ticket();

        assert!(dashboard.apply_month_income(february_ticket, Ok(dec!(17500))));
        // March's answer lands late.
        assert!(!dashboard.apply_month_income(march_ticket, Ok(dec!(18000))));
        assert_eq!(dashboard.month_income(), dec!(17500));
    }

    #[test]
    fn test_results_after_close_are_discarded() {
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        let ticket = dashboard.ticket();
        dashboard.close();

        assert!(dashboard.is_closed());
        assert!(!dashboard.apply_records(ticket, Ok(vec![])));
        assert!(!dashboard.apply_month_income(dashboard.ticket(), Ok(dec!(1))));
        assert_eq!(dashboard.month_income(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_switching_month_refetches_income() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;

        dashboard.select_period(MonthPeriod::new(2024, 2).unwrap());
        assert_eq!(dashboard.month_income(), Decimal::ZERO);
        dashboard.refresh_month_income(&api).await;

        assert_eq!(dashboard.month_income(), dec!(17500));
        assert_eq!(dashboard.calendar().len(), 29);
    }

    #[tokio::test]
    async fn test_marking_leave_shows_leave_and_refetches() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;

        assert!(dashboard.open_empty_day(date(2024, 3, 1)).is_none());
        let mut marking = dashboard.open_empty_day(date(2024, 3, 4)).unwrap();
        marking.interact().unwrap();
        dashboard.mark_leave(&mut marking, &api).await.unwrap();

        assert_eq!(dashboard.records().len(), 3);
        let views = dashboard.day_views(None);
        let march_4 = views.iter().find(|v| v.day.date() == date(2024, 3, 4)).unwrap();
        assert_eq!(march_4.status, DayStatus::Leave);
        assert_eq!(march_4.status.label(), "Leave");
        assert!(march_4.die_names.is_empty());

        // Leave days still add their pay but no overtime.
        let summary = dashboard.summary(None);
        assert_eq!(summary.totals.leave_days, 1);
        assert_eq!(summary.totals.total_overtime_hours, dec!(3.5));
    }

    #[tokio::test]
    async fn test_failed_leave_keeps_day_empty() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;
        api.fail("add_daily_production");

        let mut marking = dashboard.open_empty_day(date(2024, 3, 4)).unwrap();
        marking.interact().unwrap();
        assert!(dashboard.mark_leave(&mut marking, &api).await.is_err());

        let views = dashboard.day_views(None);
        let march_4 = views.iter().find(|v| v.day.date() == date(2024, 3, 4)).unwrap();
        assert_eq!(march_4.status.label(), "No data entered");
    }

    #[tokio::test]
    async fn test_confirmed_production_deletion_refetches() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;

        assert!(dashboard.request_production_deletion("missing").is_none());
        let pending = dashboard.request_production_deletion("1").unwrap();
        assert!(pending.prompt().contains("2024-03-01"));

        dashboard.apply_deletion(pending.confirm(), &api).await.unwrap();

        assert_eq!(dashboard.records().len(), 1);
        assert!(dashboard.calendar()[0].is_missing());
        assert_eq!(dashboard.summary(None).totals.total_pay, dec!(1800));
    }

    #[tokio::test]
    async fn test_day_views_resolve_names_and_filter() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;

        let views = dashboard.day_views(Some("ring"));
        // Day 1 matches, day 2 does not, days 3..=15 are gaps.
        assert_eq!(views.len(), 14);
        assert_eq!(views[0].die_names, vec!["Ring 10"]);
        assert_eq!(dashboard.summary(Some("ring")).totals.total_pay, dec!(1200));
    }

    #[tokio::test]
    async fn test_save_expenses_commits_backend_value() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;

        let settings = dashboard.settings_mut();
        settings.expenses.begin_edit().unwrap();
        settings.expenses.update_draft(Expenses::new(dec!(450), dec!(90))).unwrap();
        let saved = dashboard.save_expenses(&api).await.unwrap();

        assert_eq!(saved, Expenses::new(dec!(450), dec!(90)));
        assert_eq!(dashboard.summary(None).expenses.total(), dec!(540));
        // Expenses never change the headline total.
        assert_eq!(dashboard.summary(None).net_total(), dec!(23000));
    }

    #[tokio::test]
    async fn test_refresh_after_submission_picks_up_new_day() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));
        dashboard.load(&api).await;

        {
            let mut state = api.state();
            state
                .records
                .push(record("3", "2024-03-11", &["d1"], &[dec!(1)], &[dec!(9)], dec!(400)));
            state.month_income.insert((2024, 3), dec!(18400));
        }
        dashboard.refresh_after_submission(&api).await;

        assert_eq!(dashboard.records().len(), 3);
        assert_eq!(dashboard.month_income(), dec!(18400));
        assert_eq!(dashboard.summary(None).totals.total_pay, dec!(3400));
    }

    #[tokio::test]
    async fn test_load_fetches_month_income_with_the_other_sources() {
        let api = seeded_api();
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));

        dashboard.load(&api).await;

        assert_eq!(
            api.calls(),
            vec![
                "list_dies",
                "list_daily_production",
                "monthly_income_totals",
                "base_income",
                "month_income",
            ]
        );
        assert_eq!(dashboard.month_income(), dec!(18000));
    }

    #[tokio::test]
    async fn test_no_leave_offered_when_records_failed_to_load() {
        let api = seeded_api();
        api.state()
            .records
            .push(record("3", "2024-03-05", &["d1"], &[dec!(1)], &[dec!(9)], dec!(500)));
        api.fail("list_daily_production");
        let mut dashboard = MonthlyDashboard::new(date(2024, 3, 15));

        // Before any load there is nothing to judge emptiness by.
        assert!(dashboard.open_empty_day(date(2024, 3, 5)).is_none());

        dashboard.load(&api).await;
        assert!(dashboard.failure(DataSource::Productions).is_some());
        assert!(dashboard.open_empty_day(date(2024, 3, 5)).is_none());
        assert!(dashboard.open_empty_day(date(2024, 3, 6)).is_none());

        api.recover("list_daily_production");
        assert!(dashboard.refresh_records(&api).await);
        assert!(dashboard.open_empty_day(date(2024, 3, 5)).is_none());
        assert!(dashboard.open_empty_day(date(2024, 3, 6)).is_some());
    }
}
