// src/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::calendar::{classify, synthesize, CalendarDay, DayStatus, MonthPeriod};
use crate::confirm::{ConfirmedDeletion, DeletionTarget, PendingDeletion};
use crate::coverage::MonthSummary;
use crate::die_catalog::DieCatalog;
use crate::ksrubber_client::{ApiError, ProductionApi};
use crate::ksrubber_data::{DailyProductionRecord, DieRecord, Expenses, MonthlyIncomeTotals};
use crate::leave_marking::{LeaveError, LeaveMarking};
use crate::month_summary::{aggregate, matches_search};
use crate::settings::{SettingsError, SettingsReconciler};

/// Backend collections the dashboard loads independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Dies,
    Productions,
    MonthlyTotals,
    BaseIncome,
    MonthIncome,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSource::Dies => "dies",
            DataSource::Productions => "daily production",
            DataSource::MonthlyTotals => "monthly totals",
            DataSource::BaseIncome => "base income",
            DataSource::MonthIncome => "month income",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub source: DataSource,
    pub message: String,
}

/// Identifies the view a fetch was started for. Results carrying an old
/// ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// One calendar row ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DayView {
    pub day: CalendarDay,
    pub status: DayStatus,
    pub die_names: Vec<String>,
}

/// Monthly dashboard state: the loaded collections, the selected month and the
/// editable settings. Each collection loads on its own, so one failed source
/// never blanks the others.
#[derive(Debug, Clone)]
pub struct MonthlyDashboard {
    today: NaiveDate,
    period: MonthPeriod,
    catalog: DieCatalog,
    records: Vec<DailyProductionRecord>,
    records_loaded: bool,
    monthly_totals: MonthlyIncomeTotals,
    month_income: Decimal,
    settings: SettingsReconciler,
    marked_leave: HashSet<NaiveDate>,
    failures: Vec<LoadFailure>,
    generation: u64,
    closed: bool,
}

impl MonthlyDashboard {
    pub fn new(today: NaiveDate) -> Self {
        Self::for_period(MonthPeriod::containing(today), today)
    }

    pub fn for_period(period: MonthPeriod, today: NaiveDate) -> Self {
        Self {
            today,
            period,
            catalog: DieCatalog::default(),
            records: Vec::new(),
            records_loaded: false,
            monthly_totals: MonthlyIncomeTotals::default(),
            month_income: Decimal::ZERO,
            settings: SettingsReconciler::default(),
            marked_leave: HashSet::new(),
            failures: Vec::new(),
            generation: 0,
            closed: false,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn period(&self) -> MonthPeriod {
        self.period
    }

    pub fn catalog(&self) -> &DieCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &[DailyProductionRecord] {
        &self.records
    }

    pub fn monthly_totals(&self) -> &MonthlyIncomeTotals {
        &self.monthly_totals
    }

    pub fn month_income(&self) -> Decimal {
        self.month_income
    }

    pub fn settings(&self) -> &SettingsReconciler {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsReconciler {
        &mut self.settings
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn failure(&self, source: DataSource) -> Option<&LoadFailure> {
        self.failures.iter().find(|f| f.source == source)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // --- Stale-result guard ---

    pub fn ticket(&self) -> LoadTicket {
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        !self.closed && ticket.generation == self.generation
    }

    /// Switches the visible month. Fetches already in flight for the old month
    /// are discarded when they land.
    pub fn select_period(&mut self, period: MonthPeriod) {
        if period == self.period {
            return;
        }
        info!("Switching dashboard from {} to {}", self.period, period);
        self.period = period;
        self.generation += 1;
        self.month_income = Decimal::ZERO;
        self.marked_leave.clear();
        self.clear_failure(DataSource::MonthIncome);
    }

    /// The view is gone; nothing that lands afterwards is applied.
    pub fn close(&mut self) {
        self.closed = true;
        self.generation += 1;
    }

    fn record_failure(&mut self, source: DataSource, error: &ApiError) {
        warn!("Loading {} failed: {}", source, error);
        self.clear_failure(source);
        self.failures.push(LoadFailure {
            source,
            message: error.to_string(),
        });
    }

    fn clear_failure(&mut self, source: DataSource) {
        self.failures.retain(|f| f.source != source);
    }

    fn accept(&self, ticket: LoadTicket, source: DataSource) -> bool {
        let current = self.is_current(ticket);
        if !current {
            debug!("Discarding stale {} result", source);
        }
        current
    }

    // --- Applying fetch results ---

    pub fn apply_dies(&mut self, ticket: LoadTicket, result: Result<Vec<DieRecord>, ApiError>) -> bool {
        if !self.accept(ticket, DataSource::Dies) {
            return false;
        }
        match result {
            Ok(dies) => {
                self.catalog.replace_all(dies);
                self.clear_failure(DataSource::Dies);
            }
            Err(e) => self.record_failure(DataSource::Dies, &e),
        }
        true
    }

    pub fn apply_records(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<DailyProductionRecord>, ApiError>,
    ) -> bool {
        if !self.accept(ticket, DataSource::Productions) {
            return false;
        }
        match result {
            Ok(records) => {
                self.records = records;
                self.records_loaded = true;
                self.clear_failure(DataSource::Productions);
            }
            Err(e) => self.record_failure(DataSource::Productions, &e),
        }
        true
    }

    /// The aggregate also seeds the committed tea and water figures.
    pub fn apply_monthly_totals(
        &mut self,
        ticket: LoadTicket,
        result: Result<MonthlyIncomeTotals, ApiError>,
    ) -> bool {
        if !self.accept(ticket, DataSource::MonthlyTotals) {
            return false;
        }
        match result {
            Ok(totals) => {
                self.settings
                    .expenses
                    .reload(Expenses::new(totals.total_tea, totals.total_water));
                self.monthly_totals = totals;
                self.clear_failure(DataSource::MonthlyTotals);
            }
            Err(e) => self.record_failure(DataSource::MonthlyTotals, &e),
        }
        true
    }

    pub fn apply_base_income(&mut self, ticket: LoadTicket, result: Result<Decimal, ApiError>) -> bool {
        if !self.accept(ticket, DataSource::BaseIncome) {
            return false;
        }
        match result {
            Ok(income) => {
                self.settings.income.reload(income);
                self.clear_failure(DataSource::BaseIncome);
            }
            Err(e) => self.record_failure(DataSource::BaseIncome, &e),
        }
        true
    }

    /// A failed month-income fetch shows 0.
    pub fn apply_month_income(&mut self, ticket: LoadTicket, result: Result<Decimal, ApiError>) -> bool {
        if !self.accept(ticket, DataSource::MonthIncome) {
            return false;
        }
        match result {
            Ok(income) => {
                self.month_income = income;
                self.clear_failure(DataSource::MonthIncome);
            }
            Err(e) => {
                self.month_income = Decimal::ZERO;
                self.record_failure(DataSource::MonthIncome, &e);
            }
        }
        true
    }

    // --- Loading ---

    /// Loads every collection and the selected month's income concurrently.
    pub async fn load(&mut self, api: &dyn ProductionApi) {
        let ticket = self.ticket();
        let period = self.period;
        info!("Loading dashboard for {}", period);

        let (dies, records, totals, base_income, month_income) = tokio::join!(
            api.list_dies(),
            api.list_daily_production(),
            api.monthly_income_totals(),
            api.base_income(),
            api.month_income(period.year(), period.month()),
        );

        self.apply_dies(ticket, dies);
        self.apply_records(ticket, records);
        self.apply_monthly_totals(ticket, totals);
        self.apply_base_income(ticket, base_income);
        self.apply_month_income(ticket, month_income);
    }

    pub async fn refresh_month_income(&mut self, api: &dyn ProductionApi) -> bool {
        let ticket = self.ticket();
        let period = self.period;
        let result = api.month_income(period.year(), period.month()).await;
        self.apply_month_income(ticket, result)
    }

    pub async fn refresh_records(&mut self, api: &dyn ProductionApi) -> bool {
        let ticket = self.ticket();
        let result = api.list_daily_production().await;
        self.apply_records(ticket, result)
    }

    pub async fn refresh_dies(&mut self, api: &dyn ProductionApi) -> bool {
        let ticket = self.ticket();
        let result = api.list_dies().await;
        self.apply_dies(ticket, result)
    }

    /// Picks up a production submission made elsewhere: new record, new income.
    pub async fn refresh_after_submission(&mut self, api: &dyn ProductionApi) {
        self.refresh_records(api).await;
        self.refresh_month_income(api).await;
    }

    // --- Views ---

    pub fn calendar(&self) -> Vec<CalendarDay> {
        synthesize(self.period, self.today, &self.records)
    }

    pub fn day_views(&self, search: Option<&str>) -> Vec<DayView> {
        self.calendar()
            .into_iter()
            .filter(|day| matches_search(day, search, &self.catalog))
            .map(|day| {
                let status = classify(&day, &self.catalog, &self.marked_leave);
                let die_names = match (status, day.record()) {
                    (DayStatus::Production { .. }, Some(record)) => self
                        .catalog
                        .resolved_names(record)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    _ => Vec::new(),
                };
                DayView {
                    day,
                    status,
                    die_names,
                }
            })
            .collect()
    }

    pub fn summary(&self, search: Option<&str>) -> MonthSummary {
        let totals = aggregate(&self.calendar(), search, &self.catalog);
        MonthSummary::new(
            totals,
            self.settings.base_income(),
            self.month_income,
            self.settings.committed_expenses(),
        )
    }

    // --- Mutations ---

    pub async fn save_base_income(&mut self, api: &dyn ProductionApi) -> Result<Decimal, SettingsError> {
        self.settings.save_income(api).await
    }

    pub async fn save_expenses(&mut self, api: &dyn ProductionApi) -> Result<Expenses, SettingsError> {
        self.settings.save_expenses(api).await
    }

    /// Starts leave marking for an empty day of the visible month. Nothing is
    /// offered until the record list has loaded, or while its last fetch failed.
    pub fn open_empty_day(&self, date: NaiveDate) -> Option<LeaveMarking> {
        if !self.records_loaded || self.failure(DataSource::Productions).is_some() {
            debug!("Leave marking for {} unavailable: records not loaded", date);
            return None;
        }
        let is_empty = self
            .calendar()
            .iter()
            .any(|day| day.date() == date && day.is_missing());
        (is_empty && !self.marked_leave.contains(&date)).then(|| LeaveMarking::new(date))
    }

    /// Posts the leave record, shows the day as leave at once and refetches
    /// the record list.
    pub async fn mark_leave(
        &mut self,
        marking: &mut LeaveMarking,
        api: &dyn ProductionApi,
    ) -> Result<(), LeaveError> {
        marking.mark_leave(api).await?;
        self.marked_leave.insert(marking.date());
        self.refresh_records(api).await;
        Ok(())
    }

    pub fn request_production_deletion(&self, sno: &str) -> Option<PendingDeletion> {
        self.records
            .iter()
            .find(|record| record.sno == sno)
            .map(|record| PendingDeletion::production(record.sno.clone(), record.date.clone()))
    }

    pub fn request_die_deletion(&self, die_id: &str) -> Option<PendingDeletion> {
        self.catalog
            .get(die_id)
            .map(|die| PendingDeletion::die(die.die_id.clone(), die.die_name.clone()))
    }

    /// Runs a confirmed deletion, then refetches the affected collection.
    pub async fn apply_deletion(
        &mut self,
        deletion: ConfirmedDeletion,
        api: &dyn ProductionApi,
    ) -> Result<(), ApiError> {
        deletion.execute(api).await?;
        match deletion.target() {
            DeletionTarget::Production(sno) => {
                self.records.retain(|record| &record.sno != sno);
                self.refresh_records(api).await;
                self.refresh_month_income(api).await;
            }
            DeletionTarget::Die(die_id) => {
                self.catalog.remove(die_id);
                self.refresh_dies(api).await;
            }
        }
        Ok(())
    }
}
