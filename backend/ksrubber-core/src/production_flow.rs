// src/production_flow.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::calendar::{is_sunday, MonthPeriod};
use crate::coverage::format_currency;
use crate::die_catalog::DieCatalog;
use crate::ksrubber_client::{ApiError, ProductionApi};
use crate::ksrubber_data::{
    sub_flag_for, ComputePreview, ComputeRequest, ProductionSubmission, SubmitReceipt,
};

pub const SUBMIT_SUCCESS_MESSAGE: &str = "Production submitted successfully";

/// Success banner text, carrying the month income the backend now reports.
pub fn submit_success_message(receipt: &SubmitReceipt) -> String {
    match receipt.updated_income() {
        Some(income) => format!("{}. Updated income: {}", SUBMIT_SUCCESS_MESSAGE, format_currency(income)),
        None => SUBMIT_SUCCESS_MESSAGE.to_string(),
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Select at least one die before computing")]
    NoDiesSelected,
    #[error("A submission is still on display; reset the form first")]
    AwaitingReset,
    #[error("Compute request failed: {0}")]
    Api(#[from] ApiError),
}

/// Inputs for one production day.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionForm {
    pub date: NaiveDate,
    pub holiday: bool,
    /// Selection order is kept; it is the order sent to the backend.
    pub selected_dies: Vec<String>,
    pub counts: HashMap<String, u64>,
    pub tea: Decimal,
    pub water: Decimal,
}

impl ProductionForm {
    /// Sundays start out flagged as holidays.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            holiday: is_sunday(date),
            selected_dies: Vec::new(),
            counts: HashMap::new(),
            tea: Decimal::ZERO,
            water: Decimal::ZERO,
        }
    }

    /// What the form goes back to after a submission: today, nothing
    /// selected, holiday off.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            holiday: false,
            ..Self::for_date(today)
        }
    }

    /// One count per selected die; dies without a count send 0.
    pub fn selected_counts(&self) -> Vec<u64> {
        self.selected_dies
            .iter()
            .map(|id| self.counts.get(id).copied().unwrap_or(0))
            .collect()
    }

    pub fn sub_flag(&self) -> u8 {
        sub_flag_for(self.holiday)
    }

    pub fn compute_request(&self) -> ComputeRequest {
        ComputeRequest {
            input_date: self.date,
            sub_flag: self.sub_flag(),
            die_ids: self.selected_dies.clone(),
            production_counts: self.selected_counts(),
            is_holiday: self.holiday,
        }
    }

    pub fn submission(&self) -> ProductionSubmission {
        ProductionSubmission {
            die_ids: self.selected_dies.clone(),
            production_counts: self.selected_counts(),
            production_date: self.date,
            sub_flag: self.sub_flag(),
            tea: self.tea,
            water: self.water,
        }
    }
}

/// Per-die line of a compute preview.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRow {
    pub die_id: String,
    pub die_name: String,
    pub cavity: Option<u32>,
    pub overall_time: Decimal,
    pub overtime: Decimal,
    pub deleted_hours: Decimal,
    pub price: Decimal,
    pub production_per_hour: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedPreview {
    /// The request this preview answers.
    pub request: ComputeRequest,
    pub response: ComputePreview,
    pub month_income: Decimal,
    /// Set when the month income could not be fetched and 0 is shown instead.
    pub income_fallback: bool,
}

impl ComputedPreview {
    pub fn overtime_pay(&self) -> Decimal {
        self.response.new_daily_pro.monthly_pay
    }

    pub fn net_total(&self) -> Decimal {
        self.overtime_pay().saturating_add(self.month_income)
    }

    pub fn rows(&self, catalog: &DieCatalog) -> Vec<PreviewRow> {
        let day = &self.response.new_daily_pro;
        let at = |list: &[Decimal], idx: usize| list.get(idx).copied().unwrap_or_default();

        let ids: Vec<(String, String)> = if self.response.details.is_empty() {
            self.request
                .die_ids
                .iter()
                .map(|id| (id.clone(), String::new()))
                .collect()
        } else {
            self.response
                .details
                .iter()
                .map(|d| (d.die_id.clone(), d.die_name.clone()))
                .collect()
        };

        ids.into_iter()
            .enumerate()
            .map(|(idx, (die_id, reported_name))| {
                let die = catalog.get(&die_id);
                let die_name = match die {
                    Some(die) => die.die_name.clone(),
                    None if !reported_name.is_empty() => reported_name,
                    None => die_id.clone(),
                };
                PreviewRow {
                    die_name,
                    cavity: die.map(|d| d.cavity),
                    overall_time: at(&day.overall_time, idx),
                    overtime: at(&day.overtime, idx),
                    deleted_hours: at(&day.delete_index_hr, idx),
                    price: at(&day.price, idx),
                    production_per_hour: die.map(|d| d.production_per_hour),
                    die_id,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient message shown after a submit, until the form resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

/// `Idle -> Previewed -> Stale -> Previewed -> Submitted`. Only `Previewed`
/// may be submitted; any edit to the computed inputs moves it to `Stale`.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowPhase {
    Idle,
    Previewed(ComputedPreview),
    /// Inputs changed after the last compute. The old preview stays visible.
    Stale(ComputedPreview),
    Submitted(Banner),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing to submit: no fresh preview.
    Skipped,
    Accepted(SubmitReceipt),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionComputeFlow {
    form: ProductionForm,
    phase: FlowPhase,
}

impl ProductionComputeFlow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            form: ProductionForm::for_date(date),
            phase: FlowPhase::Idle,
        }
    }

    pub fn form(&self) -> &ProductionForm {
        &self.form
    }

    pub fn phase(&self) -> &FlowPhase {
        &self.phase
    }

    pub fn preview(&self) -> Option<&ComputedPreview> {
        match &self.phase {
            FlowPhase::Previewed(preview) | FlowPhase::Stale(preview) => Some(preview),
            _ => None,
        }
    }

    pub fn banner(&self) -> Option<&Banner> {
        match &self.phase {
            FlowPhase::Submitted(banner) => Some(banner),
            _ => None,
        }
    }

    /// True only for a preview computed from exactly the current inputs.
    pub fn can_submit(&self) -> bool {
        match &self.phase {
            FlowPhase::Previewed(preview) => preview.request == self.form.compute_request(),
            _ => false,
        }
    }

    fn invalidate(&mut self) {
        self.phase = match std::mem::replace(&mut self.phase, FlowPhase::Idle) {
            FlowPhase::Previewed(preview) | FlowPhase::Stale(preview) => FlowPhase::Stale(preview),
            other => other,
        };
    }

    /// Moves to `date`; the holiday flag follows the weekday again.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.form.date = date;
        self.form.holiday = is_sunday(date);
        self.invalidate();
    }

    pub fn set_holiday(&mut self, holiday: bool) {
        if self.form.holiday != holiday {
            self.form.holiday = holiday;
            self.invalidate();
        }
    }

    /// Replaces the selection. Duplicates are dropped, first occurrence wins.
    pub fn select_dies<I, S>(&mut self, die_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected: Vec<String> = Vec::new();
        for id in die_ids.into_iter().map(Into::into) {
            if !selected.contains(&id) {
                selected.push(id);
            }
        }
        self.form.selected_dies = selected;
        self.invalidate();
    }

    pub fn set_count(&mut self, die_id: &str, count: u64) {
        self.form.counts.insert(die_id.to_string(), count);
        self.invalidate();
    }

    // Expenses ride along with the submit only; they do not affect the preview.
    pub fn set_tea(&mut self, tea: Decimal) {
        self.form.tea = tea;
    }

    pub fn set_water(&mut self, water: Decimal) {
        self.form.water = water;
    }

    /// Asks the backend for the per-die breakdown of the current inputs, then
    /// fetches the month income for the selected date's month.
    pub async fn compute(&mut self, api: &dyn ProductionApi) -> Result<ComputedPreview, FlowError> {
        if matches!(self.phase, FlowPhase::Submitted(_)) {
            return Err(FlowError::AwaitingReset);
        }
        if self.form.selected_dies.is_empty() {
            return Err(FlowError::NoDiesSelected);
        }

        let request = self.form.compute_request();
        self.invalidate();
        info!(
            "Computing production for {} ({} dies, sub_flag={})",
            request.input_date,
            request.die_ids.len(),
            request.sub_flag
        );

        let response = api.compute_production(&request).await.map_err(|e| {
            error!("Compute failed for {}: {}", request.input_date, e);
            FlowError::Api(e)
        })?;

        let period = MonthPeriod::containing(request.input_date);
        let (month_income, income_fallback) = match api.month_income(period.year(), period.month()).await {
            Ok(income) => (income, false),
            Err(e) => {
                warn!("Month income for {} unavailable, showing 0: {}", period, e);
                (Decimal::ZERO, true)
            }
        };

        let preview = ComputedPreview {
            request,
            response,
            month_income,
            income_fallback,
        };
        self.phase = FlowPhase::Previewed(preview.clone());
        Ok(preview)
    }

    /// Persists the previewed inputs. A no-op unless [`Self::can_submit`].
    /// Success or failure, the flow ends in `Submitted` until
    /// [`Self::finish_submission`]; there is no retry.
    pub async fn submit(&mut self, api: &dyn ProductionApi) -> SubmitOutcome {
        if !self.can_submit() {
            debug!("Submit ignored: no fresh preview");
            return SubmitOutcome::Skipped;
        }

        let submission = self.form.submission();
        match api.submit_production(&submission).await {
            Ok(receipt) => {
                info!("Submitted production for {}", submission.production_date);
                self.phase = FlowPhase::Submitted(Banner {
                    kind: BannerKind::Success,
                    message: submit_success_message(&receipt),
                });
                SubmitOutcome::Accepted(receipt)
            }
            Err(e) => {
                error!("Submit failed for {}: {}", submission.production_date, e);
                let message = format!("Failed to submit production: {}", e);
                self.phase = FlowPhase::Submitted(Banner {
                    kind: BannerKind::Error,
                    message: message.clone(),
                });
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Clears the banner and resets the form. Returns false when there was no
    /// submission to finish.
    pub fn finish_submission(&mut self, today: NaiveDate) -> bool {
        if !matches!(self.phase, FlowPhase::Submitted(_)) {
            return false;
        }
        self.form = ProductionForm::blank(today);
        self.phase = FlowPhase::Idle;
        true
    }

    /// [`Self::submit`], then keep the banner up for `banner_window` and reset.
    pub async fn submit_and_reset(
        &mut self,
        api: &dyn ProductionApi,
        banner_window: Duration,
        today: NaiveDate,
    ) -> SubmitOutcome {
        let outcome = self.submit(api).await;
        if outcome != SubmitOutcome::Skipped {
            tokio::time::sleep(banner_window).await;
            self.finish_submission(today);
        }
        outcome
    }
}
