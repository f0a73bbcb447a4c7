// src/test_support.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::ksrubber_client::{ApiError, ProductionApi};
use crate::ksrubber_data::*;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn die(id: &str, name: &str, company: &str) -> DieRecord {
    DieRecord {
        die_id: id.to_string(),
        die_name: name.to_string(),
        company_name: company.to_string(),
        materials: "EPDM".to_string(),
        cavity: 4,
        weight: Decimal::ONE,
        production_per_hour: Decimal::from(100),
        price: Decimal::from(2),
    }
}

/// A production record with one overtime and one overall-time entry per die.
pub fn record(
    sno: &str,
    date: &str,
    die_ids: &[&str],
    overtime: &[Decimal],
    overall_time: &[Decimal],
    monthly_pay: Decimal,
) -> DailyProductionRecord {
    DailyProductionRecord {
        sno: sno.to_string(),
        date: date.to_string(),
        die_ids: die_ids.iter().map(|id| id.to_string()).collect(),
        overall_production: vec![Decimal::ZERO; die_ids.len()],
        overall_time: overall_time.to_vec(),
        overtime: overtime.to_vec(),
        price: vec![Decimal::ZERO; die_ids.len()],
        monthly_pay,
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub dies: Vec<DieRecord>,
    pub records: Vec<DailyProductionRecord>,
    pub totals: MonthlyIncomeTotals,
    pub base_income: Decimal,
    pub month_income: HashMap<(i32, u32), Decimal>,
    pub compute_response: ComputePreview,
    /// Operations that answer with a 500.
    pub failing: HashSet<&'static str>,
    pub calls: Vec<&'static str>,
    pub added_entries: Vec<DailyProductionEntry>,
    pub compute_requests: Vec<ComputeRequest>,
    pub submissions: Vec<ProductionSubmission>,
    pub saved_expenses: Vec<Expenses>,
    /// `updated_income` of the next submit receipt.
    pub updated_income: serde_json::Value,
    pub next_id: u32,
}

/// In-memory backend that records every call.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail(&self, op: &'static str) {
        self.state().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state().failing.remove(op);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == op).count()
    }

    fn begin(&self, op: &'static str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state();
        state.calls.push(op);
        if state.failing.contains(op) {
            return Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{} failed", op),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl ProductionApi for FakeApi {
    async fn list_dies(&self) -> Result<Vec<DieRecord>, ApiError> {
        Ok(self.begin("list_dies")?.dies.clone())
    }

    async fn add_die(&self, new_die: &NewDie) -> Result<String, ApiError> {
        let mut state = self.begin("add_die")?;
        state.next_id += 1;
        let die_id = format!("KSD{:03}", state.next_id);
        state.dies.push(DieRecord {
            die_id: die_id.clone(),
            die_name: new_die.die_name.clone(),
            company_name: new_die.company_name.clone(),
            materials: new_die.materials.clone(),
            cavity: new_die.cavity,
            weight: new_die.weight,
            production_per_hour: new_die.production_per_hour,
            price: new_die.price,
        });
        Ok(die_id)
    }

    async fn edit_die(&self, die_id: &str, update: &DieUpdate) -> Result<DieRecord, ApiError> {
        let mut state = self.begin("edit_die")?;
        let die = state
            .dies
            .iter_mut()
            .find(|d| d.die_id == die_id)
            .ok_or_else(|| ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: "Die not found".to_string(),
            })?;
        if let Some(name) = &update.die_name {
            die.die_name = name.clone();
        }
        if let Some(company) = &update.company_name {
            die.company_name = company.clone();
        }
        if let Some(price) = update.price {
            die.price = price;
        }
        Ok(die.clone())
    }

    async fn delete_die(&self, die_id: &str) -> Result<(), ApiError> {
        self.begin("delete_die")?.dies.retain(|d| d.die_id != die_id);
        Ok(())
    }

    async fn list_daily_production(&self) -> Result<Vec<DailyProductionRecord>, ApiError> {
        Ok(self.begin("list_daily_production")?.records.clone())
    }

    async fn add_daily_production(&self, entry: &DailyProductionEntry) -> Result<(), ApiError> {
        let mut state = self.begin("add_daily_production")?;
        state.next_id += 1;
        let sno = state.next_id.to_string();
        let zeros = vec![Decimal::ZERO; entry.die_ids.len()];
        state.records.push(DailyProductionRecord {
            sno,
            date: entry.production_date.format("%Y-%m-%d").to_string(),
            die_ids: entry.die_ids.clone(),
            overall_production: zeros.clone(),
            overall_time: zeros.clone(),
            overtime: zeros.clone(),
            price: zeros,
            monthly_pay: Decimal::ZERO,
        });
        state.added_entries.push(entry.clone());
        Ok(())
    }

    async fn delete_production(&self, sno: &str) -> Result<(), ApiError> {
        self.begin("delete_production")?.records.retain(|r| r.sno != sno);
        Ok(())
    }

    async fn compute_production(&self, request: &ComputeRequest) -> Result<ComputePreview, ApiError> {
        let mut state = self.begin("compute_production")?;
        state.compute_requests.push(request.clone());
        Ok(state.compute_response.clone())
    }

    async fn submit_production(
        &self,
        submission: &ProductionSubmission,
    ) -> Result<SubmitReceipt, ApiError> {
        let mut state = self.begin("submit_production")?;
        state.submissions.push(submission.clone());
        Ok(SubmitReceipt {
            status: Some(STATUS_SUCCESS.to_string()),
            updated_income: state.updated_income.clone(),
        })
    }

    async fn monthly_income_totals(&self) -> Result<MonthlyIncomeTotals, ApiError> {
        Ok(self.begin("monthly_income_totals")?.totals.clone())
    }

    async fn update_current_expenses(&self, expenses: &Expenses) -> Result<Expenses, ApiError> {
        let mut state = self.begin("update_current_expenses")?;
        state.saved_expenses.push(*expenses);
        state.totals.total_tea = expenses.tea;
        state.totals.total_water = expenses.water;
        Ok(*expenses)
    }

    async fn base_income(&self) -> Result<Decimal, ApiError> {
        Ok(self.begin("base_income")?.base_income)
    }

    async fn update_base_income(&self, income: Decimal) -> Result<Decimal, ApiError> {
        let mut state = self.begin("update_base_income")?;
        state.base_income = income;
        Ok(income)
    }

    async fn month_income(&self, year: i32, month: u32) -> Result<Decimal, ApiError> {
        let state = self.begin("month_income")?;
        Ok(state.month_income.get(&(year, month)).copied().unwrap_or_default())
    }
}
