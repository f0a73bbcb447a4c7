// src/ksrubber_data.rs

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Placeholder die posted for a leave day. The backend catalog maps it to a
/// die named [`LEAVE_DIE_NAME`].
pub const LEAVE_DIE_ID: &str = "KSD223adbd2";
pub const LEAVE_DIE_NAME: &str = "none";

/// `sub_flag` values understood by the backend. Note the inversion: a holiday
/// is sent as 0.
pub const SUB_FLAG_HOLIDAY: u8 = 0;
pub const SUB_FLAG_WORKDAY: u8 = 1;

pub const STATUS_SUCCESS: &str = "success";

pub fn sub_flag_for(is_holiday: bool) -> u8 {
    if is_holiday {
        SUB_FLAG_HOLIDAY
    } else {
        SUB_FLAG_WORKDAY
    }
}

// --- Lenient decoding ---
//
// The backend is loose about numeric types: counts and amounts arrive as
// numbers, numeric strings or occasionally garbage. Anything that does not
// parse becomes zero, anything that should be a list and is not becomes empty.

fn parse_decimal_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

pub fn decimal_from_value(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal_str(&n.to_string())
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => parse_decimal_str(s).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Like [`decimal_from_value`] but distinguishes "no number here" from zero.
pub fn strict_decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_str(&n.to_string()).or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

/// Adds `value` to a running total. A value that would overflow is dropped
/// like any other garbage the backend sends.
pub fn accumulate(total: Decimal, value: Decimal, what: &str) -> Decimal {
    total.checked_add(value).unwrap_or_else(|| {
        warn!("Ignoring {} value {}: total would overflow", what, value);
        total
    })
}

pub fn string_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

pub fn lenient_decimal_list<'de, D>(deserializer: D) -> Result<Vec<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(decimal_from_value).collect(),
        _ => Vec::new(),
    })
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(string_from_value(&value))
}

pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(string_from_value).collect(),
        _ => Vec::new(),
    })
}

pub fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value)
        .trunc()
        .to_u32()
        .unwrap_or_default())
}

/// Decodes each element of an array independently, dropping the ones that do
/// not fit `T`.
pub fn items_from_value<T: DeserializeOwned>(value: Value, context: &str) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match serde_json::from_value::<T>(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Skipping malformed item #{} in '{}': {}", idx, context, e);
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(
                "Expected a list in '{}' but got {}; treating as empty",
                context,
                json_kind(&other)
            );
            Vec::new()
        }
    }
}

pub fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(items_from_value(value, "nested list"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Base income arrives either as `{income}` or `{data: {income}}`.
pub fn income_from_response(body: &Value) -> Option<Decimal> {
    body.get("income")
        .and_then(strict_decimal_from_value)
        .or_else(|| {
            body.get("data")
                .and_then(|data| data.get("income"))
                .and_then(strict_decimal_from_value)
        })
}

/// Month income: `{status: "success", data: {income}}`, or a bare `{income}`.
/// Every other shape reads as zero.
pub fn month_income_from_response(body: &Value) -> Decimal {
    let succeeded = body.get("status").and_then(Value::as_str) == Some(STATUS_SUCCESS);
    if succeeded {
        if let Some(income) = body
            .get("data")
            .and_then(|data| data.get("income"))
            .and_then(strict_decimal_from_value)
        {
            return income;
        }
    }
    body.get("income")
        .and_then(strict_decimal_from_value)
        .unwrap_or(Decimal::ZERO)
}

// --- Die catalog ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DieRecord {
    #[serde(rename = "DieId", deserialize_with = "lenient_string")]
    pub die_id: String,
    #[serde(rename = "DieName", default, deserialize_with = "lenient_string")]
    pub die_name: String,
    #[serde(rename = "CompanyName", default, deserialize_with = "lenient_string")]
    pub company_name: String,
    #[serde(rename = "Materials", default, deserialize_with = "lenient_string")]
    pub materials: String,
    #[serde(rename = "Cavity", default, deserialize_with = "lenient_count")]
    pub cavity: u32,
    #[serde(rename = "Weight", default, deserialize_with = "lenient_decimal")]
    pub weight: Decimal,
    /// Units produced per hour.
    #[serde(rename = "Pro_hr_count", default, deserialize_with = "lenient_decimal")]
    pub production_per_hour: Decimal,
    #[serde(rename = "Price", default, deserialize_with = "lenient_decimal")]
    pub price: Decimal,
}

/// Body of `add_die`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDie {
    #[serde(rename = "DieName")]
    pub die_name: String,
    #[serde(rename = "CompanyName")]
    pub company_name: String,
    #[serde(rename = "Materials")]
    pub materials: String,
    #[serde(rename = "Cavity")]
    pub cavity: u32,
    #[serde(rename = "Weight", serialize_with = "rust_decimal::serde::float::serialize")]
    pub weight: Decimal,
    #[serde(
        rename = "Pro_hr_count",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub production_per_hour: Decimal,
    #[serde(rename = "Price", serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
}

/// Partial body of `edit_die/{DieId}`; unset fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DieUpdate {
    #[serde(rename = "DieName", skip_serializing_if = "Option::is_none")]
    pub die_name: Option<String>,
    #[serde(rename = "CompanyName", skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(rename = "Materials", skip_serializing_if = "Option::is_none")]
    pub materials: Option<String>,
    #[serde(rename = "Cavity", skip_serializing_if = "Option::is_none")]
    pub cavity: Option<u32>,
    #[serde(
        rename = "Weight",
        skip_serializing_if = "Option::is_none",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    pub weight: Option<Decimal>,
    #[serde(
        rename = "Pro_hr_count",
        skip_serializing_if = "Option::is_none",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    pub production_per_hour: Option<Decimal>,
    #[serde(
        rename = "Price",
        skip_serializing_if = "Option::is_none",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    pub price: Option<Decimal>,
}

// --- Daily production ---

/// One persisted production day. `die_ids` and the four numeric lists are
/// parallel: index `i` of each list describes the same die.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DailyProductionRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sno: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "DieId", default, deserialize_with = "lenient_string_list")]
    pub die_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub overall_production: Vec<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub overall_time: Vec<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub overtime: Vec<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub price: Vec<Decimal>,
    #[serde(rename = "monthy_pay", default, deserialize_with = "lenient_decimal")]
    pub monthly_pay: Decimal,
}

impl DailyProductionRecord {
    /// The record date, tolerating a trailing time component.
    pub fn production_date(&self) -> Option<NaiveDate> {
        let day_part = self.date.get(..10).unwrap_or(&self.date);
        NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
    }

    pub fn total_overtime(&self) -> Decimal {
        self.overtime
            .iter()
            .fold(Decimal::ZERO, |total, hours| accumulate(total, *hours, "overtime hours"))
    }

    /// On a holiday every hour worked is overtime, so the backend reports
    /// `overtime[i] == overall_time[i]` for every die.
    pub fn is_holiday(&self) -> bool {
        !self.overtime.is_empty()
            && self.overtime.len() == self.overall_time.len()
            && self
                .overtime
                .iter()
                .zip(&self.overall_time)
                .all(|(overtime, overall)| overtime == overall)
    }
}

/// Body of `add_daily_production`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProductionEntry {
    #[serde(rename = "DieIds")]
    pub die_ids: Vec<String>,
    #[serde(rename = "ProductionCounts")]
    pub production_counts: Vec<u64>,
    pub production_date: NaiveDate,
    pub sub_flag: u8,
}

impl DailyProductionEntry {
    /// The record that marks `date` as a leave day.
    pub fn leave(date: NaiveDate) -> Self {
        Self {
            die_ids: vec![LEAVE_DIE_ID.to_string()],
            production_counts: vec![0],
            production_date: date,
            sub_flag: SUB_FLAG_WORKDAY,
        }
    }
}

// --- Compute / submit ---

/// `compute_production/?input_date&sub_flag`. The date and flag travel in the
/// query string, the rest in the JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeRequest {
    #[serde(skip)]
    pub input_date: NaiveDate,
    #[serde(skip)]
    pub sub_flag: u8,
    pub die_ids: Vec<String>,
    pub production_counts: Vec<u64>,
    pub is_holiday: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ComputedDay {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub overall_time: Vec<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub overtime: Vec<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub price: Vec<Decimal>,
    /// Hours the backend trimmed from a die's overtime.
    #[serde(default, deserialize_with = "lenient_decimal_list")]
    pub delete_index_hr: Vec<Decimal>,
    #[serde(rename = "monthy_pay", default, deserialize_with = "lenient_decimal")]
    pub monthly_pay: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub daily_income: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ComputedDieDetail {
    #[serde(rename = "DieId", default, deserialize_with = "lenient_string")]
    pub die_id: String,
    #[serde(rename = "DieName", default, deserialize_with = "lenient_string")]
    pub die_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ComputePreview {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub new_daily_pro: ComputedDay,
    #[serde(default, deserialize_with = "lenient_items")]
    pub details: Vec<ComputedDieDetail>,
}

/// Body of `calculate_production_hours`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionSubmission {
    #[serde(rename = "DieIds")]
    pub die_ids: Vec<String>,
    #[serde(rename = "ProductionCounts")]
    pub production_counts: Vec<u64>,
    pub production_date: NaiveDate,
    pub sub_flag: u8,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub tea: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub water: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_income: Value,
}

impl SubmitReceipt {
    /// The month income after this submission, when the backend reported one.
    pub fn updated_income(&self) -> Option<Decimal> {
        strict_decimal_from_value(&self.updated_income)
    }
}

// --- Income and expenses ---

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MonthlyIncomeTotals {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_income: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_tea: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_water: Decimal,
}

/// Tea and water spend for the current month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Expenses {
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "lenient_decimal"
    )]
    pub tea: Decimal,
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "lenient_decimal"
    )]
    pub water: Decimal,
}

impl Expenses {
    pub fn new(tea: Decimal, water: Decimal) -> Self {
        Self { tea, water }
    }

    pub fn total(&self) -> Decimal {
        self.tea.saturating_add(self.water)
    }
}
